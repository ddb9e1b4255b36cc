//! Workflow state machine states.
//!
//! Exactly one [`WorkflowState`] is active at a time and every mutation goes
//! through the orchestrator.  The transitions are:
//!
//! ```text
//! Idle ──start_capture──▶ Recording ──stop_capture──▶ Ready
//! Idle | Ready | Completed | Failed ──adopt_file──▶ Ready
//! Ready | Completed ──submit──▶ Submitting ──success──▶ Completed
//!                                          ──failure──▶ Ready
//! any non-busy state ──reset──▶ Idle
//! ```
//!
//! Artifact handles ride inside the variants, so holding a state is holding
//! the clips it refers to; replacing the state releases them.

use crate::job::ProgressCell;
use crate::source::AudioArtifact;

/// States of the audio transformation workflow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    /// No clip held, nothing in flight.
    #[default]
    Idle,

    /// A capture session is live; the canonical clip (if any) from before
    /// the recording is retained until the new one is adopted.
    Recording,

    /// A canonical clip is held and can be submitted.
    Ready { source: AudioArtifact },

    /// A submission is in flight.  `progress` is live — the estimator task
    /// advances it while the orchestrator awaits the exchange.
    Submitting {
        source: AudioArtifact,
        progress: ProgressCell,
    },

    /// A processed clip arrived.  A resting state: re-submit with edited
    /// parameters, adopt a new file, or start a new capture from here.
    Completed {
        original: AudioArtifact,
        processed: AudioArtifact,
    },

    /// A recording was lost after the device was already released and there
    /// was no prior clip to fall back to.
    Failed { reason: String },
}

impl WorkflowState {
    /// `true` while an exclusive activity (capture or submission) is live.
    ///
    /// Busy states reject every operation except the one that ends them.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkflowState::Recording | WorkflowState::Submitting { .. }
        )
    }

    /// Short human-readable label for status displays and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::Recording => "Recording",
            WorkflowState::Ready { .. } => "Ready",
            WorkflowState::Submitting { .. } => "Submitting",
            WorkflowState::Completed { .. } => "Completed",
            WorkflowState::Failed { .. } => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
