//! Immutable audio clip handles.
//!
//! An [`AudioArtifact`] pairs a byte payload with its media type.  The payload
//! lives in a [`bytes::Bytes`], so cloning a handle is cheap and the bytes are
//! freed when the last handle is dropped — "replacing releases the prior one"
//! falls out of ordinary ownership.

use bytes::Bytes;

// ---------------------------------------------------------------------------
// AudioArtifact
// ---------------------------------------------------------------------------

/// An immutable handle to one audio clip: payload bytes plus a media type.
///
/// Produced either by the user selecting a file or by finalizing a capture
/// session.  The payload is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    data: Bytes,
    media_type: String,
}

impl AudioArtifact {
    /// Wrap a payload and its declared media type (e.g. `audio/wav`).
    pub fn new(data: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// The raw payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The declared media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// `true` when the payload is empty (legal for a zero-chunk capture).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the declared media type is an audio type (`audio/*`).
    pub fn is_audio(&self) -> bool {
        self.media_type.starts_with("audio/")
    }
}

// ---------------------------------------------------------------------------
// Size labels
// ---------------------------------------------------------------------------

/// Format a byte count as a human-readable label.
///
/// Binary units (1024-based), rounded to two decimals with trailing zeros
/// trimmed: `2400000` → `"2.29 MB"`, `1536` → `"1.5 KB"`, `0` → `"0 Bytes"`.
/// Anything at or above a gigabyte stays in `GB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".into();
    }

    let exp = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exp as i32);

    let mut label = format!("{value:.2}");
    while label.ends_with('0') {
        label.pop();
    }
    if label.ends_with('.') {
        label.pop();
    }

    format!("{} {}", label, UNITS[exp])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
