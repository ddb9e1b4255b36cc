//! Transformation parameters and presets.
//!
//! * [`ParameterStore`] — the live triple, validated at the boundary.
//! * [`TransformParameters`] — the immutable snapshot a submission carries.
//! * [`PRESETS`] — the fixed named triples.

pub mod store;

pub use store::{
    preset_named, ParamError, ParamField, ParameterStore, Preset, TransformParameters,
    BASE_FREQUENCY_RANGE, FORMANT_SHIFT_RANGE, PITCH_SHIFT_RANGE, PRESETS,
};
