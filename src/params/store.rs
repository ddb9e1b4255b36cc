//! Transformation parameters, slider bounds, presets, and the store that
//! guards them.
//!
//! The store is pure data: its only side effect is one
//! [`WorkflowEvent::ParameterChanged`] notification per successful mutation.
//! Out-of-range values are rejected, never clamped.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

use crate::events::{EventBus, WorkflowEvent};

/// Allowed pitch-shift values (semitone-style, signed).
pub const PITCH_SHIFT_RANGE: RangeInclusive<f32> = -20.0..=20.0;
/// Allowed formant-shift values (signed).
pub const FORMANT_SHIFT_RANGE: RangeInclusive<f32> = -10.0..=10.0;
/// Allowed base-frequency values in Hz.
pub const BASE_FREQUENCY_RANGE: RangeInclusive<u32> = 50..=500;

// ---------------------------------------------------------------------------
// TransformParameters
// ---------------------------------------------------------------------------

/// The three knobs sent to the remote transformation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParameters {
    /// Signed pitch shift, default 0.
    pub pitch_shift: f32,
    /// Signed formant shift, default 0.
    pub formant_shift: f32,
    /// Base frequency in Hz, default 100.
    pub base_frequency: u32,
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self {
            pitch_shift: 0.0,
            formant_shift: 0.0,
            base_frequency: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// ParamField
// ---------------------------------------------------------------------------

/// Names one of the three parameter fields.
///
/// Parses from the wire names used by the remote exchange (`shift`,
/// `formant`, `base`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    PitchShift,
    FormantShift,
    BaseFrequency,
}

impl ParamField {
    pub fn name(self) -> &'static str {
        match self {
            ParamField::PitchShift => "shift",
            ParamField::FormantShift => "formant",
            ParamField::BaseFrequency => "base",
        }
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamField {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shift" => Ok(ParamField::PitchShift),
            "formant" => Ok(ParamField::FormantShift),
            "base" => Ok(ParamField::BaseFrequency),
            other => Err(ParamError::UnknownField(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// A named fixed parameter triple.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub params: TransformParameters,
}

const fn preset(name: &'static str, shift: f32, formant: f32, base: u32) -> Preset {
    Preset {
        name,
        params: TransformParameters {
            pitch_shift: shift,
            formant_shift: formant,
            base_frequency: base,
        },
    }
}

/// The fixed preset set.
pub const PRESETS: [Preset; 6] = [
    preset("male-to-female", 10.0, 2.0, 100),
    preset("female-to-male", -15.0, -4.0, 300),
    preset("robot", 0.0, 5.0, 50),
    preset("deep", -15.0, -3.0, 250),
    preset("high-pitch", 15.0, 3.0, 80),
    preset("reset", 0.0, 0.0, 100),
];

/// Look up a preset triple by name.
pub fn preset_named(name: &str) -> Option<TransformParameters> {
    PRESETS.iter().find(|p| p.name == name).map(|p| p.params)
}

// ---------------------------------------------------------------------------
// ParamError
// ---------------------------------------------------------------------------

/// Rejections from the parameter store.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    /// The value lies outside the declared bound for the field.
    #[error("{field} value {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The preset name is not in the fixed set.
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),

    /// The field name is not one of `shift`, `formant`, `base`.
    #[error("unknown parameter field `{0}`")]
    UnknownField(String),
}

fn out_of_range(field: ParamField, value: f64, range: RangeInclusive<f64>) -> ParamError {
    ParamError::OutOfRange {
        field: field.name(),
        value,
        min: *range.start(),
        max: *range.end(),
    }
}

// ---------------------------------------------------------------------------
// ParameterStore
// ---------------------------------------------------------------------------

/// Holds the live parameter triple.
///
/// Observers receive exactly one [`WorkflowEvent::ParameterChanged`] per
/// successful mutation — a preset replaces all three fields atomically and
/// still produces a single notification, so a partially-applied preset is
/// never observable.
pub struct ParameterStore {
    params: TransformParameters,
    events: EventBus,
}

impl ParameterStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            params: TransformParameters::default(),
            events,
        }
    }

    /// Set one field.
    ///
    /// # Errors
    ///
    /// [`ParamError::OutOfRange`] when `value` lies outside the field's
    /// declared bound; the stored triple is untouched and no notification is
    /// sent.  Base frequency is rounded to the nearest integer after the
    /// range check.
    pub fn set(&mut self, field: ParamField, value: f64) -> Result<(), ParamError> {
        match field {
            ParamField::PitchShift => {
                if !PITCH_SHIFT_RANGE.contains(&(value as f32)) {
                    return Err(out_of_range(
                        field,
                        value,
                        *PITCH_SHIFT_RANGE.start() as f64..=*PITCH_SHIFT_RANGE.end() as f64,
                    ));
                }
                self.params.pitch_shift = value as f32;
            }
            ParamField::FormantShift => {
                if !FORMANT_SHIFT_RANGE.contains(&(value as f32)) {
                    return Err(out_of_range(
                        field,
                        value,
                        *FORMANT_SHIFT_RANGE.start() as f64..=*FORMANT_SHIFT_RANGE.end() as f64,
                    ));
                }
                self.params.formant_shift = value as f32;
            }
            ParamField::BaseFrequency => {
                let rounded = value.round();
                if rounded < *BASE_FREQUENCY_RANGE.start() as f64
                    || rounded > *BASE_FREQUENCY_RANGE.end() as f64
                {
                    return Err(out_of_range(
                        field,
                        value,
                        *BASE_FREQUENCY_RANGE.start() as f64..=*BASE_FREQUENCY_RANGE.end() as f64,
                    ));
                }
                self.params.base_frequency = rounded as u32;
            }
        }

        self.notify();
        Ok(())
    }

    /// Replace all three fields with a named preset.
    ///
    /// # Errors
    ///
    /// [`ParamError::UnknownPreset`] when `name` is not in [`PRESETS`]; the
    /// stored triple is untouched.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ParamError> {
        let params =
            preset_named(name).ok_or_else(|| ParamError::UnknownPreset(name.to_string()))?;
        self.params = params;
        self.notify();
        Ok(())
    }

    /// An immutable copy of the current triple.
    ///
    /// Taken when a submission begins, so edits made while the job is in
    /// flight never alter it.
    pub fn snapshot(&self) -> TransformParameters {
        self.params
    }

    fn notify(&self) {
        self.events.emit(WorkflowEvent::ParameterChanged {
            params: self.params,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
