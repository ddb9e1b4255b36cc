//! Capture backend abstraction.
//!
//! The session manager in this crate never talks to hardware directly; it
//! drives a [`CaptureBackend`] that acquires a device, streams data chunks
//! over an mpsc channel, and hands back a [`CaptureStream`] guard.  Releasing
//! the device is tied to consuming that guard, so no code path can hold a
//! device past the end of a session.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// CaptureProfile
// ---------------------------------------------------------------------------

/// Fixed quality profile a capture session requests from its backend.
///
/// The processing toggles are forwarded to the backend; a backend applies
/// whatever its platform actually exposes (the microphone backend honours the
/// nominal rate and channel count).
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureProfile {
    /// Nominal sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 = mono).
    pub channels: u16,
    /// Request echo cancellation where the platform supports it.
    pub echo_cancellation: bool,
    /// Request noise suppression where the platform supports it.
    pub noise_suppression: bool,
    /// Cadence at which buffered data is flushed as one chunk.
    pub chunk_interval: Duration,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            chunk_interval: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Failures in the capture lifecycle.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Permission denied, no device present, or the device is busy.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `start()` while a session is already active.
    #[error("a capture session is already active")]
    AlreadyCapturing,

    /// `stop()` with no active session.
    #[error("no capture session is active")]
    NotCapturing,

    /// The collected chunks could not be encoded into a clip.  The device
    /// has already been released when this surfaces.
    #[error("failed to finalize captured clip: {0}")]
    Finalize(String),
}

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// A capture device provider.
///
/// `acquire` must be all-or-nothing: on error, every partially acquired
/// resource has already been released before the error is returned.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request exclusive device access with `profile` and start delivering
    /// data chunks to `tx` in arrival order.
    async fn acquire(
        &self,
        profile: &CaptureProfile,
        tx: mpsc::Sender<Bytes>,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// A live, exclusive capture.  Dropping the stream also releases the device.
pub trait CaptureStream: Send {
    /// Halt chunk delivery and release the device.
    ///
    /// Consumes the stream and returns the encoder that turns the collected
    /// chunks into one clip.  The release is unconditional — it happens
    /// whether or not the later encode succeeds.
    fn release(self: Box<Self>) -> Box<dyn ClipEncoder>;
}

/// Turns the ordered chunk sequence of a finished capture into one clip.
pub trait ClipEncoder: Send {
    /// Container media type of the encoded clip (e.g. `audio/wav`).
    fn media_type(&self) -> &str;

    /// Encode `chunks`, concatenated in order, into a single payload.
    /// Zero chunks is legal and yields a minimal (header-only) clip.
    fn encode(&self, chunks: &[Bytes]) -> Result<Bytes, CaptureError>;
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
