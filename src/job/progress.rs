//! Displayed-progress estimation for an in-flight submission.
//!
//! The remote protocol exposes no granular transfer progress, so the number
//! shown to the user while a job runs is an **estimate, not a measurement**:
//! a periodic task advances it by a random 0–15 points per tick and caps it
//! at 90 until the real exchange resolves.  Nothing may treat these values
//! as a correctness signal.
//!
//! The estimator is a [`TaskGuard`]-owned task, so cancellation is the act
//! of dropping it — guaranteed on every exit path of the runner.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::events::{EventBus, WorkflowEvent};
use crate::task::TaskGuard;

/// Ceiling the estimator may reach before the real exchange completes.
pub const ESTIMATE_CEILING: u8 = 90;

// ---------------------------------------------------------------------------
// ProgressCell
// ---------------------------------------------------------------------------

/// Shared, monotonically non-decreasing 0–100 progress value.
///
/// The estimator task writes it; the workflow state holds a clone so live
/// progress is readable while a submission is in flight.
#[derive(Debug, Clone, Default)]
pub struct ProgressCell(Arc<AtomicU8>);

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the value to `percent` if that is an increase; lower values are
    /// ignored.  Returns the value now held.
    pub(crate) fn advance_to(&self, percent: u8) -> u8 {
        self.0.fetch_max(percent, Ordering::AcqRel).max(percent)
    }
}

impl PartialEq for ProgressCell {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

// ---------------------------------------------------------------------------
// ProgressEstimator
// ---------------------------------------------------------------------------

/// The periodic estimation task.  Dropping the value cancels it.
pub(crate) struct ProgressEstimator {
    _task: TaskGuard,
}

impl ProgressEstimator {
    /// Start estimating: every `cadence`, add a random 0–15 points, capped
    /// at [`ESTIMATE_CEILING`], and emit the displayed value.
    pub(crate) fn start(cell: ProgressCell, events: EventBus, cadence: Duration) -> Self {
        let task = TaskGuard::spawn(async move {
            let mut interval = tokio::time::interval(cadence);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // the immediate first tick
            let mut estimate = 0.0f32;
            loop {
                interval.tick().await;
                estimate += rand::thread_rng().gen_range(0.0f32..15.0);
                if estimate > ESTIMATE_CEILING as f32 {
                    estimate = ESTIMATE_CEILING as f32;
                }
                let percent = cell.advance_to(estimate.round() as u8);
                events.emit(WorkflowEvent::SubmissionProgress { percent });
            }
        });
        Self { _task: task }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
