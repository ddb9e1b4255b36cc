//! Transformation job submission.
//!
//! [`JobRunner`] drives one submission at a time: it snapshots the inputs
//! into a [`TransformationJob`], runs the real exchange and the progress
//! estimator on independent timelines, and joins them deterministically —
//! the estimator is always cancelled before the final 100% is published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::events::{EventBus, WorkflowEvent};
use crate::params::TransformParameters;
use crate::source::AudioArtifact;

use super::progress::{ProgressCell, ProgressEstimator};
use super::remote::{RemoteError, TransformService};

/// Estimator tick cadence.
pub const PROGRESS_CADENCE: Duration = Duration::from_millis(200);
/// Delay before the progress display is cleared after a job resolves.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// JobError
// ---------------------------------------------------------------------------

/// Rejections and failures of a submission.
#[derive(Debug, Error)]
pub enum JobError {
    /// No clip is held to submit.
    #[error("no audio clip to submit")]
    NoSource,

    /// A job is already in flight; only one is permitted.
    #[error("a submission is already in flight")]
    AlreadySubmitting,

    /// The remote exchange failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

// ---------------------------------------------------------------------------
// TransformationJob
// ---------------------------------------------------------------------------

/// One submission: a clip, the parameter snapshot it was sent with, and the
/// progress cell observers watch.  Lives only for the duration of the
/// exchange.
struct TransformationJob {
    source: AudioArtifact,
    params: TransformParameters,
    progress: ProgressCell,
}

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

/// Submits clips to a [`TransformService`], one at a time.
pub struct JobRunner {
    service: Arc<dyn TransformService>,
    events: EventBus,
    busy: AtomicBool,
    cadence: Duration,
    settle_delay: Duration,
}

/// Clears the busy flag on every exit path of `submit`.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobRunner {
    pub fn new(service: Arc<dyn TransformService>, events: EventBus) -> Self {
        Self {
            service,
            events,
            busy: AtomicBool::new(false),
            cadence: PROGRESS_CADENCE,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override the estimator cadence and settle delay (tests, tuning).
    pub fn with_timing(mut self, cadence: Duration, settle_delay: Duration) -> Self {
        self.cadence = cadence;
        self.settle_delay = settle_delay;
        self
    }

    /// Whether a job is currently in flight.
    pub fn is_submitting(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one submission to completion.
    ///
    /// `progress` is the cell observers (and the workflow state) read; on
    /// success it is forced to 100 only after the estimator has been
    /// cancelled.  The submitted clip is never consumed — a failed exchange
    /// leaves the caller's artifact untouched.
    ///
    /// # Errors
    ///
    /// [`JobError::NoSource`] when `source` is `None`,
    /// [`JobError::AlreadySubmitting`] while another job is in flight,
    /// [`JobError::Remote`] when the exchange fails.
    pub async fn submit(
        &self,
        source: Option<AudioArtifact>,
        params: TransformParameters,
        progress: ProgressCell,
    ) -> Result<AudioArtifact, JobError> {
        let source = source.ok_or(JobError::NoSource)?;

        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(JobError::AlreadySubmitting);
        }
        let _busy = BusyGuard(&self.busy);

        let job = TransformationJob {
            source,
            params,
            progress,
        };

        log::info!(
            "job: submitting {} bytes (shift={}, formant={}, base={})",
            job.source.len(),
            job.params.pitch_shift,
            job.params.formant_shift,
            job.params.base_frequency
        );

        let estimator =
            ProgressEstimator::start(job.progress.clone(), self.events.clone(), self.cadence);

        let outcome = self.service.transform(&job.source, &job.params).await;

        // Cancel the estimator before publishing any terminal progress value.
        drop(estimator);
        self.spawn_settle();

        match outcome {
            Ok(processed) => {
                job.progress.advance_to(100);
                self.events
                    .emit(WorkflowEvent::SubmissionProgress { percent: 100 });
                log::info!("job: exchange succeeded ({} bytes)", processed.len());
                Ok(processed)
            }
            Err(e) => {
                log::warn!("job: exchange failed: {e}");
                Err(JobError::Remote(e))
            }
        }
    }

    /// One-shot cosmetic task: hide/reset the progress display after the
    /// settle delay.
    fn spawn_settle(&self) {
        let events = self.events.clone();
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.emit(WorkflowEvent::SubmissionProgressCleared);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::super::remote::mock::MockTransformService;
    use super::super::ESTIMATE_CEILING;
    use super::*;

    fn clip() -> AudioArtifact {
        AudioArtifact::new(Bytes::from_static(b"pcm-data"), "audio/wav")
    }

    fn runner(service: MockTransformService) -> JobRunner {
        JobRunner::new(Arc::new(service), EventBus::new(256))
            .with_timing(Duration::from_millis(5), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn missing_source_is_rejected() {
        let runner = runner(MockTransformService::succeeding(b"out"));

        let err = runner
            .submit(None, TransformParameters::default(), ProgressCell::new())
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::NoSource));
        assert!(!runner.is_submitting());
    }

    #[tokio::test]
    async fn successful_exchange_returns_the_processed_clip() {
        let runner = runner(MockTransformService::succeeding(b"transformed"));
        let progress = ProgressCell::new();

        let processed = runner
            .submit(Some(clip()), TransformParameters::default(), progress.clone())
            .await
            .unwrap();

        assert_eq!(processed.data().as_ref(), b"transformed");
        assert_eq!(progress.get(), 100);
        assert!(!runner.is_submitting());
    }

    #[tokio::test]
    async fn failed_exchange_surfaces_the_status() {
        let runner = runner(MockTransformService::failing(502));
        let progress = ProgressCell::new();

        let err = runner
            .submit(Some(clip()), TransformParameters::default(), progress.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Remote(RemoteError::Status(502))));
        // Failure never fakes completion.
        assert!(progress.get() <= ESTIMATE_CEILING);
        assert!(!runner.is_submitting());
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected() {
        let (service, release) = MockTransformService::gated();
        let runner = Arc::new(runner(service));

        let first = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                runner
                    .submit(Some(clip()), TransformParameters::default(), ProgressCell::new())
                    .await
            })
        };

        // Let the first submission take the busy flag.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let err = runner
            .submit(Some(clip()), TransformParameters::default(), ProgressCell::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::AlreadySubmitting));

        release.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        assert!(!runner.is_submitting());
    }

    #[tokio::test]
    async fn progress_stays_under_the_ceiling_until_completion_then_hits_100() {
        let service = MockTransformService::succeeding(b"out");
        let bus = EventBus::new(1024);
        let mut rx = bus.subscribe();
        let runner = JobRunner::new(Arc::new(service), bus)
            .with_timing(Duration::from_millis(2), Duration::from_millis(5));

        runner
            .submit(Some(clip()), TransformParameters::default(), ProgressCell::new())
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let WorkflowEvent::SubmissionProgress { percent } = event {
                seen.push(percent);
            }
        }

        let (last, estimates) = seen.split_last().unwrap();
        assert_eq!(*last, 100);
        assert!(estimates.iter().all(|&p| p <= ESTIMATE_CEILING));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn settle_delay_clears_the_progress_display() {
        let service = MockTransformService::succeeding(b"out");
        let bus = EventBus::new(1024);
        let mut rx = bus.subscribe();
        let runner = JobRunner::new(Arc::new(service), bus)
            .with_timing(Duration::from_millis(5), Duration::from_millis(10));

        runner
            .submit(Some(clip()), TransformParameters::default(), ProgressCell::new())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let mut cleared = 0;
        while let Ok(event) = rx.try_recv() {
            if event == WorkflowEvent::SubmissionProgressCleared {
                cleared += 1;
            }
        }
        assert_eq!(cleared, 1);
    }

    #[tokio::test]
    async fn service_is_called_exactly_once_per_submission() {
        let service = Arc::new(MockTransformService::succeeding(b"out"));
        let shared: Arc<dyn TransformService> = service.clone();
        let runner = JobRunner::new(shared, EventBus::new(64))
            .with_timing(Duration::from_millis(5), Duration::from_millis(5));

        runner
            .submit(Some(clip()), TransformParameters::default(), ProgressCell::new())
            .await
            .unwrap();

        assert_eq!(service.calls(), 1);
    }
}
