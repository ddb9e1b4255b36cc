//! The top-level workflow orchestrator.
//!
//! [`WorkflowOrchestrator`] owns the state machine and the four collaborators
//! (parameter store, capture session manager, source resolver, job runner),
//! all injected at construction.  It is the only component a presentation
//! layer talks to: operations are methods, feedback is the event stream from
//! [`WorkflowOrchestrator::subscribe`].
//!
//! Operations invoked in a state where they are not valid fail with
//! [`WorkflowError::InvalidTransition`] and leave the state untouched;
//! capture and submission failures roll back to the last stable state
//! instead of stranding the machine mid-transition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::capture::{CaptureBackend, CaptureError, CaptureSessionManager};
use crate::config::AppConfig;
use crate::events::{EventBus, WorkflowEvent};
use crate::export::{self, ExportError};
use crate::job::{JobError, JobRunner, ProgressCell, TransformService};
use crate::params::{ParamError, ParamField, ParameterStore, TransformParameters};
use crate::source::{AudioArtifact, SourceError, SourceResolver};

use super::state::WorkflowState;

// ---------------------------------------------------------------------------
// WorkflowError
// ---------------------------------------------------------------------------

/// Everything an orchestrator operation can fail with.
///
/// All variants are recoverable; none poisons the workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The operation is not valid in the current state.
    #[error("`{operation}` is not valid in the {state} state")]
    InvalidTransition {
        state: &'static str,
        operation: &'static str,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// WorkflowOrchestrator
// ---------------------------------------------------------------------------

/// Orchestrates one audio clip through capture/selection, submission, and
/// completion.  One instance per application lifetime; no ambient globals.
pub struct WorkflowOrchestrator {
    state: WorkflowState,
    events: EventBus,
    params: ParameterStore,
    capture: CaptureSessionManager,
    resolver: SourceResolver,
    runner: JobRunner,
}

impl WorkflowOrchestrator {
    /// Compose an orchestrator from explicitly injected collaborators.
    ///
    /// All collaborators must share `events`, otherwise observers miss the
    /// notifications those components emit.
    pub fn new(
        events: EventBus,
        params: ParameterStore,
        capture: CaptureSessionManager,
        resolver: SourceResolver,
        runner: JobRunner,
    ) -> Self {
        Self {
            state: WorkflowState::Idle,
            events,
            params,
            capture,
            resolver,
            runner,
        }
    }

    /// Convenience constructor wiring production collaborators from config.
    pub fn from_config(
        config: &AppConfig,
        backend: Arc<dyn CaptureBackend>,
        service: Arc<dyn TransformService>,
    ) -> Self {
        let events = EventBus::default();
        let params = ParameterStore::new(events.clone());
        let capture =
            CaptureSessionManager::new(backend, config.capture.profile(), events.clone());
        let resolver = SourceResolver::new(events.clone());
        let runner = JobRunner::new(service, events.clone());
        Self::new(events, params, capture, resolver, runner)
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Subscribe to the workflow notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// The active state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// The canonical current clip (original), if one is held.
    pub fn current_source(&self) -> Option<&AudioArtifact> {
        self.resolver.current()
    }

    /// The processed clip, present only in `Completed`.
    pub fn processed(&self) -> Option<&AudioArtifact> {
        match &self.state {
            WorkflowState::Completed { processed, .. } => Some(processed),
            _ => None,
        }
    }

    /// Live displayed progress, present only while `Submitting`.
    pub fn progress(&self) -> Option<u8> {
        match &self.state {
            WorkflowState::Submitting { progress, .. } => Some(progress.get()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Set one transformation parameter.  Valid in every state; edits during
    /// a submission do not affect the in-flight job (it holds a snapshot).
    pub fn set_parameter(&mut self, field: ParamField, value: f64) -> Result<(), WorkflowError> {
        self.params.set(field, value)?;
        Ok(())
    }

    /// Apply a named preset atomically.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.params.apply_preset(name)?;
        Ok(())
    }

    /// The current parameter triple.
    pub fn parameters(&self) -> TransformParameters {
        self.params.snapshot()
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// `Idle | Ready | Completed | Failed → Recording`.
    ///
    /// Leaving `Completed` discards the processed clip; the original stays
    /// canonical until a new clip is adopted.  On acquisition failure the
    /// state is unchanged.
    pub async fn start_capture(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Idle
            | WorkflowState::Ready { .. }
            | WorkflowState::Completed { .. }
            | WorkflowState::Failed { .. } => {}
            _ => return Err(self.invalid("start_capture")),
        }

        self.capture.start().await?;
        self.state = WorkflowState::Recording;
        Ok(())
    }

    /// `Recording → Ready`: finalize the capture and adopt it as the
    /// canonical clip (it becomes both "current" and "original").
    ///
    /// The device is released no matter what.  If finalization or adoption
    /// fails afterwards, the machine rolls back to `Ready` with the prior
    /// clip when one is still held, or to `Failed` when the recording was
    /// the only clip there was.
    pub async fn stop_capture(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.state, WorkflowState::Recording) {
            return Err(self.invalid("stop_capture"));
        }

        let clip = match self.capture.stop().await {
            Ok(clip) => clip,
            Err(e) => {
                self.state = self.capture_rollback(e.to_string());
                return Err(e.into());
            }
        };

        match self.resolver.adopt(clip) {
            Ok(source) => {
                let source = source.clone();
                self.state = WorkflowState::Ready { source };
                Ok(())
            }
            Err(e) => {
                self.state = self.capture_rollback(e.to_string());
                Err(e.into())
            }
        }
    }

    fn capture_rollback(&self, reason: String) -> WorkflowState {
        match self.resolver.current() {
            Some(prior) => WorkflowState::Ready {
                source: prior.clone(),
            },
            None => WorkflowState::Failed { reason },
        }
    }

    // -----------------------------------------------------------------------
    // File adoption
    // -----------------------------------------------------------------------

    /// `Idle | Ready | Completed | Failed → Ready`: adopt a user-selected
    /// clip, superseding whatever was held.  Validation failures leave both
    /// state and held clip untouched.
    pub fn adopt_file(&mut self, candidate: AudioArtifact) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Idle
            | WorkflowState::Ready { .. }
            | WorkflowState::Completed { .. }
            | WorkflowState::Failed { .. } => {}
            _ => return Err(self.invalid("adopt_file")),
        }

        let source = self.resolver.adopt(candidate)?.clone();
        self.state = WorkflowState::Ready { source };
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// `Ready | Completed → Submitting → Completed` on success, back to
    /// `Ready` on failure.
    ///
    /// The parameters are snapshotted at entry.  A failed submission never
    /// discards the original clip, and `submission-failed` is emitted
    /// exactly once for it.
    pub async fn submit(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Ready { .. } | WorkflowState::Completed { .. } => {}
            _ => return Err(self.invalid("submit")),
        }

        let Some(source) = self.resolver.current().cloned() else {
            return Err(JobError::NoSource.into());
        };

        let snapshot = self.params.snapshot();
        let progress = ProgressCell::new();
        self.state = WorkflowState::Submitting {
            source: source.clone(),
            progress: progress.clone(),
        };

        match self.runner.submit(Some(source.clone()), snapshot, progress).await {
            Ok(processed) => {
                self.state = WorkflowState::Completed {
                    original: source,
                    processed,
                };
                self.events.emit(WorkflowEvent::SubmissionSucceeded);
                Ok(())
            }
            Err(e) => {
                self.state = WorkflowState::Ready { source };
                self.events.emit(WorkflowEvent::SubmissionFailed {
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reset and export
    // -----------------------------------------------------------------------

    /// Return to `Idle`, dropping all held clips.  Never triggered
    /// automatically; rejected while capture or submission is live.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if self.state.is_busy() {
            return Err(self.invalid("reset"));
        }
        self.resolver.clear();
        self.state = WorkflowState::Idle;
        self.events.emit(WorkflowEvent::WorkflowReset);
        Ok(())
    }

    /// Write the processed clip into `dir` under the suggested export
    /// filename.  One-way; does not change the state machine.
    pub fn export_processed(&self, dir: &Path) -> Result<PathBuf, WorkflowError> {
        match &self.state {
            WorkflowState::Completed { processed, .. } => Ok(export::write_clip(processed, dir)?),
            _ => Err(self.invalid("export_processed")),
        }
    }

    fn invalid(&self, operation: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            state: self.state.label(),
            operation,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::capture::{CaptureProfile, MockBackend};
    use crate::job::MockTransformService;

    use super::*;

    fn harness(
        backend: MockBackend,
        service: MockTransformService,
    ) -> (
        WorkflowOrchestrator,
        broadcast::Receiver<WorkflowEvent>,
    ) {
        let events = EventBus::new(1024);
        let rx = events.subscribe();
        let params = ParameterStore::new(events.clone());
        let capture = CaptureSessionManager::new(
            Arc::new(backend),
            CaptureProfile::default(),
            events.clone(),
        );
        let resolver = SourceResolver::new(events.clone());
        let runner = JobRunner::new(Arc::new(service), events.clone())
            .with_timing(Duration::from_millis(2), Duration::from_millis(5));
        (
            WorkflowOrchestrator::new(events, params, capture, resolver, runner),
            rx,
        )
    }

    fn quiet_harness() -> (WorkflowOrchestrator, broadcast::Receiver<WorkflowEvent>) {
        harness(
            MockBackend::with_chunks(vec![]),
            MockTransformService::succeeding(b"processed"),
        )
    }

    fn audio_clip(len: usize) -> AudioArtifact {
        AudioArtifact::new(vec![7u8; len], "audio/wav")
    }

    fn drain(rx: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    // ---- basics ---

    #[tokio::test]
    async fn starts_idle_with_default_parameters() {
        let (orchestrator, _rx) = quiet_harness();
        assert_eq!(*orchestrator.state(), WorkflowState::Idle);
        assert_eq!(orchestrator.parameters(), TransformParameters::default());
        assert!(orchestrator.current_source().is_none());
        assert!(orchestrator.processed().is_none());
    }

    #[tokio::test]
    async fn adopt_file_reaches_ready_and_labels_the_size() {
        let (mut orchestrator, mut rx) = quiet_harness();

        orchestrator.adopt_file(audio_clip(2_400_000)).unwrap();

        assert_eq!(orchestrator.state().label(), "Ready");
        let events = drain(&mut rx);
        assert!(events.contains(&WorkflowEvent::SourceLoaded {
            label: "2.29 MB".into(),
            size_bytes: 2_400_000,
        }));
    }

    // ---- invalid transitions ---

    #[tokio::test]
    async fn stop_capture_in_idle_is_invalid_and_state_holds() {
        let (mut orchestrator, _rx) = quiet_harness();

        let err = orchestrator.stop_capture().await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                state: "Idle",
                operation: "stop_capture",
            }
        ));
        assert_eq!(*orchestrator.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn submit_in_idle_is_invalid() {
        let (mut orchestrator, _rx) = quiet_harness();

        let err = orchestrator.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(*orchestrator.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn start_capture_while_recording_is_invalid() {
        let (mut orchestrator, _rx) = quiet_harness();

        orchestrator.start_capture().await.unwrap();
        let err = orchestrator.start_capture().await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                state: "Recording",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn adopt_file_while_recording_is_invalid() {
        let (mut orchestrator, _rx) = quiet_harness();

        orchestrator.start_capture().await.unwrap();
        let err = orchestrator.adopt_file(audio_clip(10)).unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert!(orchestrator.current_source().is_none());
    }

    // ---- capture ---

    #[tokio::test]
    async fn capture_roundtrip_reaches_ready_with_the_finalized_clip() {
        let (mut orchestrator, mut rx) = harness(
            MockBackend::with_chunks(vec![b"aa", b"bb"]),
            MockTransformService::succeeding(b"processed"),
        );

        orchestrator.start_capture().await.unwrap();
        assert_eq!(*orchestrator.state(), WorkflowState::Recording);
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.stop_capture().await.unwrap();

        assert_eq!(orchestrator.state().label(), "Ready");
        let source = orchestrator.current_source().unwrap();
        assert_eq!(source.data().as_ref(), b"aabb");
        assert_eq!(source.media_type(), "audio/wav");

        let events = drain(&mut rx);
        assert!(events.contains(&WorkflowEvent::CaptureStarted));
        assert!(events.contains(&WorkflowEvent::CaptureStopped));
    }

    #[tokio::test]
    async fn failed_device_acquisition_stays_in_the_prior_state() {
        let (mut orchestrator, _rx) = harness(
            MockBackend::unavailable(),
            MockTransformService::succeeding(b"processed"),
        );

        let err = orchestrator.start_capture().await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Capture(CaptureError::DeviceUnavailable(_))
        ));
        assert_eq!(*orchestrator.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn finalize_failure_without_a_prior_clip_enters_failed() {
        let (mut orchestrator, _rx) = harness(
            MockBackend::failing_encoder(vec![b"aa"]),
            MockTransformService::succeeding(b"processed"),
        );

        orchestrator.start_capture().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let err = orchestrator.stop_capture().await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Capture(CaptureError::Finalize(_))
        ));
        assert!(matches!(
            orchestrator.state(),
            WorkflowState::Failed { .. }
        ));
        // Recovery paths stay open.
        orchestrator.adopt_file(audio_clip(10)).unwrap();
        assert_eq!(orchestrator.state().label(), "Ready");
    }

    #[tokio::test]
    async fn finalize_failure_with_a_prior_clip_rolls_back_to_ready() {
        let (mut orchestrator, _rx) = harness(
            MockBackend::failing_encoder(vec![b"aa"]),
            MockTransformService::succeeding(b"processed"),
        );

        orchestrator.adopt_file(audio_clip(123)).unwrap();
        orchestrator.start_capture().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        orchestrator.stop_capture().await.unwrap_err();

        assert_eq!(orchestrator.state().label(), "Ready");
        assert_eq!(orchestrator.current_source().unwrap().len(), 123);
    }

    // ---- submission ---

    #[tokio::test]
    async fn submit_scenario_progress_then_success_with_original_intact() {
        let (mut orchestrator, mut rx) = quiet_harness();

        orchestrator.adopt_file(audio_clip(2_400_000)).unwrap();
        orchestrator.set_parameter(ParamField::PitchShift, 10.0).unwrap();
        orchestrator.set_parameter(ParamField::FormantShift, 2.0).unwrap();
        orchestrator.set_parameter(ParamField::BaseFrequency, 100.0).unwrap();

        orchestrator.submit().await.unwrap();

        assert_eq!(orchestrator.state().label(), "Completed");
        assert_eq!(
            orchestrator.processed().unwrap().data().as_ref(),
            b"processed"
        );
        // Original unchanged and still canonical.
        assert_eq!(orchestrator.current_source().unwrap().len(), 2_400_000);

        let events = drain(&mut rx);
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                WorkflowEvent::SubmissionProgress { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), 100);
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == WorkflowEvent::SubmissionSucceeded)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn failed_submission_returns_to_ready_with_one_failure_event() {
        let (mut orchestrator, mut rx) = harness(
            MockBackend::with_chunks(vec![]),
            MockTransformService::failing(500),
        );

        orchestrator.adopt_file(audio_clip(321)).unwrap();
        let err = orchestrator.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::Job(JobError::Remote(_))));
        assert_eq!(orchestrator.state().label(), "Ready");
        assert_eq!(orchestrator.current_source().unwrap().len(), 321);
        assert!(orchestrator.processed().is_none());

        let events = drain(&mut rx);
        let failures: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::SubmissionFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0],
            &WorkflowEvent::SubmissionFailed {
                reason: "transformation service returned status 500".into()
            }
        );
    }

    #[tokio::test]
    async fn resubmit_from_completed_with_edited_parameters() {
        let (mut orchestrator, _rx) = quiet_harness();

        orchestrator.adopt_file(audio_clip(50)).unwrap();
        orchestrator.submit().await.unwrap();
        assert_eq!(orchestrator.state().label(), "Completed");

        orchestrator.apply_preset("robot").unwrap();
        orchestrator.submit().await.unwrap();

        assert_eq!(orchestrator.state().label(), "Completed");
        assert_eq!(orchestrator.current_source().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn leaving_completed_for_a_new_capture_keeps_the_original() {
        let (mut orchestrator, _rx) = quiet_harness();

        orchestrator.adopt_file(audio_clip(50)).unwrap();
        orchestrator.submit().await.unwrap();

        orchestrator.start_capture().await.unwrap();

        assert_eq!(*orchestrator.state(), WorkflowState::Recording);
        assert!(orchestrator.processed().is_none());
        // The original stays canonical until the new clip is adopted.
        assert_eq!(orchestrator.current_source().unwrap().len(), 50);
    }

    // ---- reset and export ---

    #[tokio::test]
    async fn reset_returns_to_idle_and_drops_clips() {
        let (mut orchestrator, mut rx) = quiet_harness();

        orchestrator.adopt_file(audio_clip(10)).unwrap();
        orchestrator.reset().unwrap();

        assert_eq!(*orchestrator.state(), WorkflowState::Idle);
        assert!(orchestrator.current_source().is_none());
        assert!(drain(&mut rx).contains(&WorkflowEvent::WorkflowReset));
    }

    #[tokio::test]
    async fn reset_while_recording_is_invalid() {
        let (mut orchestrator, _rx) = quiet_harness();

        orchestrator.start_capture().await.unwrap();
        let err = orchestrator.reset().unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(*orchestrator.state(), WorkflowState::Recording);
    }

    #[tokio::test]
    async fn export_writes_the_processed_clip() {
        let (mut orchestrator, _rx) = quiet_harness();
        let dir = tempfile::tempdir().unwrap();

        orchestrator.adopt_file(audio_clip(10)).unwrap();
        orchestrator.submit().await.unwrap();

        let path = orchestrator.export_processed(dir.path()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            export::SUGGESTED_FILENAME
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"processed");
    }

    #[tokio::test]
    async fn export_without_a_processed_clip_is_invalid() {
        let (orchestrator, _rx) = quiet_harness();
        let dir = tempfile::tempdir().unwrap();

        let err = orchestrator.export_processed(dir.path()).unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    // ---- parameters ---

    #[tokio::test]
    async fn parameter_edits_flow_through_the_orchestrator() {
        let (mut orchestrator, mut rx) = quiet_harness();

        orchestrator.apply_preset("high-pitch").unwrap();

        assert_eq!(orchestrator.parameters().pitch_shift, 15.0);
        let events = drain(&mut rx);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, WorkflowEvent::ParameterChanged { .. }))
                .count(),
            1
        );
    }
}
