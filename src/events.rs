//! Workflow notification bus.
//!
//! The orchestrator and its collaborators emit [`WorkflowEvent`]s on an
//! [`EventBus`]; a presentation layer subscribes with [`EventBus::subscribe`]
//! and renders them however it likes.  The bus is a thin wrapper around
//! `tokio::sync::broadcast`, so any number of observers can listen and the
//! workflow stays fully testable without a UI attached.
//!
//! Emission never blocks and never fails: an event with no subscribers is
//! simply dropped.

use tokio::sync::broadcast;

use crate::params::TransformParameters;

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// Notifications emitted over the lifetime of an audio workflow.
///
/// Payloads are ready to display; observers never need to reach back into the
/// orchestrator to render one.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A new source clip was adopted (file selection or finalized capture).
    ///
    /// `label` is the human-readable size ("2.29 MB"), `size_bytes` the exact
    /// payload length.
    SourceLoaded { label: String, size_bytes: u64 },

    /// A capture session acquired the device and is recording.
    CaptureStarted,

    /// Once-per-second elapsed-time reading while recording, formatted
    /// `mm:ss` with both fields zero-padded.  Advisory telemetry only.
    CaptureElapsed { display: String },

    /// The capture session ended and the device was released.
    CaptureStopped,

    /// Displayed submission progress, 0–100.
    ///
    /// Values up to 90 come from the estimator and are an approximation, not
    /// a measurement; 100 is emitted only once the real exchange finished.
    SubmissionProgress { percent: u8 },

    /// The remote exchange completed and a processed clip is available.
    SubmissionSucceeded,

    /// The remote exchange failed; the original clip is untouched.
    SubmissionFailed { reason: String },

    /// Cosmetic: the progress indicator should be hidden and reset to 0.
    /// Sent a couple of seconds after a submission resolves either way.
    SubmissionProgressCleared,

    /// The parameter triple changed; carries the full current values so a
    /// preset application shows up as exactly one notification.
    ParameterChanged { params: TransformParameters },

    /// The workflow was manually reset to `Idle`.
    WorkflowReset,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One-to-many broadcast channel for [`WorkflowEvent`]s.
///
/// Cheap to clone; every component holding a clone emits into the same
/// stream.  Slow subscribers that fall more than the bus capacity behind
/// observe a `Lagged` error from `broadcast` and can resubscribe.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus able to buffer `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: WorkflowEvent) {
        log::trace!("events: {event:?}");
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(WorkflowEvent::CaptureStarted);

        assert_eq!(rx.recv().await.unwrap(), WorkflowEvent::CaptureStarted);
    }

    #[tokio::test]
    async fn emit_reaches_every_subscriber() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(WorkflowEvent::CaptureStopped);

        assert_eq!(a.recv().await.unwrap(), WorkflowEvent::CaptureStopped);
        assert_eq!(b.recv().await.unwrap(), WorkflowEvent::CaptureStopped);
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(8);
        // Must not panic or error.
        bus.emit(WorkflowEvent::WorkflowReset);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn clones_share_the_same_stream() {
        let bus = EventBus::new(8);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.emit(WorkflowEvent::SubmissionSucceeded);

        assert_eq!(rx.recv().await.unwrap(), WorkflowEvent::SubmissionSucceeded);
    }
}
