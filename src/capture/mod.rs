//! Live audio capture — device acquisition, chunk accumulation, finalization.
//!
//! # Architecture
//!
//! ```text
//! CaptureSessionManager ──acquire(profile, tx)──▶ CaptureBackend
//!        │                                            │
//!        │◀── Box<dyn CaptureStream> (device guard) ──┘
//!        │
//!        ├─ accumulator task: chunk rx → ordered buffer
//!        ├─ ticker task: 1 Hz CaptureElapsed events
//!        └─ stop(): release device → drain → ClipEncoder → AudioArtifact
//! ```
//!
//! [`MicrophoneBackend`] is the production backend (cpal, WAV container);
//! the traits keep the session manager and orchestrator testable without
//! hardware.

pub mod backend;
pub mod microphone;
pub mod session;

pub use backend::{CaptureBackend, CaptureError, CaptureProfile, CaptureStream, ClipEncoder};
pub use microphone::MicrophoneBackend;
pub use session::CaptureSessionManager;

// test-only re-export so workflow tests can script capture sessions without
// reaching into the backend module.
#[cfg(test)]
pub(crate) use backend::mock::MockBackend;
