//! Canonical "current audio" resolution.
//!
//! [`SourceResolver`] normalizes either input path — a user-selected file or
//! a finalized capture — into the single canonical clip the rest of the
//! workflow operates on.  Adoption validates the candidate at the boundary;
//! a rejected candidate leaves the held clip untouched.

use thiserror::Error;

use crate::events::{EventBus, WorkflowEvent};

use super::artifact::{format_size, AudioArtifact};

/// Largest accepted clip payload: 50 MiB, boundary inclusive.
pub const MAX_CLIP_BYTES: u64 = 50 * 1024 * 1024;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Validation failures when adopting a candidate clip.
#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    /// The candidate does not declare an `audio/*` media type.
    #[error("selected input is not audio (media type `{0}`)")]
    AudioTypeRequired(String),

    /// The candidate payload is larger than [`MAX_CLIP_BYTES`].
    #[error("clip is {size} bytes, above the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },
}

// ---------------------------------------------------------------------------
// SourceResolver
// ---------------------------------------------------------------------------

/// Holds the canonical current clip and vets every replacement.
///
/// Adopting while a clip is already held is always legal and simply
/// supersedes it; the superseded handle is released here.
pub struct SourceResolver {
    events: EventBus,
    current: Option<AudioArtifact>,
}

impl SourceResolver {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            current: None,
        }
    }

    /// Validate `candidate` and make it the canonical current clip.
    ///
    /// Emits [`WorkflowEvent::SourceLoaded`] with the human-readable size
    /// label on success.  On failure nothing changes and no event is sent.
    ///
    /// # Errors
    ///
    /// [`SourceError::AudioTypeRequired`] for non-audio media types,
    /// [`SourceError::SizeLimitExceeded`] above 50 MiB (exactly 50 MiB is
    /// accepted).
    pub fn adopt(&mut self, candidate: AudioArtifact) -> Result<&AudioArtifact, SourceError> {
        if !candidate.is_audio() {
            return Err(SourceError::AudioTypeRequired(
                candidate.media_type().to_string(),
            ));
        }
        if candidate.len() > MAX_CLIP_BYTES {
            return Err(SourceError::SizeLimitExceeded {
                size: candidate.len(),
                limit: MAX_CLIP_BYTES,
            });
        }

        log::debug!(
            "source: adopted {} clip ({} bytes)",
            candidate.media_type(),
            candidate.len()
        );
        self.events.emit(WorkflowEvent::SourceLoaded {
            label: format_size(candidate.len()),
            size_bytes: candidate.len(),
        });

        Ok(self.current.insert(candidate))
    }

    /// The canonical current clip, if one is held.
    pub fn current(&self) -> Option<&AudioArtifact> {
        self.current.as_ref()
    }

    /// Drop the held clip, if any.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
