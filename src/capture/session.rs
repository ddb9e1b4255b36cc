//! Capture session lifecycle.
//!
//! [`CaptureSessionManager`] enforces the `Inactive → Active → Inactive`
//! session protocol: at most one live session, chunks appended in arrival
//! order, and a stop sequence in which the device release never depends on
//! the clip finalization succeeding.
//!
//! # Stop ordering
//!
//! ```text
//! stop()
//!   ├─ elapsed ticker cancelled        (TaskGuard drop)
//!   ├─ device released                 (CaptureStream::release, unconditional)
//!   ├─ accumulator drained to its end  (chunk channel closed by the release)
//!   └─ chunks encoded into one clip    (may fail; device is already free)
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::events::{EventBus, WorkflowEvent};
use crate::source::AudioArtifact;
use crate::task::TaskGuard;

use super::backend::{CaptureBackend, CaptureError, CaptureProfile, CaptureStream};

/// Buffered chunks between backend delivery and the accumulator task.
const CHUNK_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// CaptureSessionManager
// ---------------------------------------------------------------------------

/// Owns at most one live capture session.
pub struct CaptureSessionManager {
    backend: Arc<dyn CaptureBackend>,
    profile: CaptureProfile,
    events: EventBus,
    active: Option<ActiveSession>,
}

/// The transient per-session entity: stream guard, chunk buffer, timers.
/// Dropping it (manager teardown included) releases the device and cancels
/// both tasks.
struct ActiveSession {
    stream: Box<dyn CaptureStream>,
    chunks: Arc<Mutex<Vec<Bytes>>>,
    accumulator: TaskGuard,
    ticker: TaskGuard,
}

impl CaptureSessionManager {
    pub fn new(backend: Arc<dyn CaptureBackend>, profile: CaptureProfile, events: EventBus) -> Self {
        Self {
            backend,
            profile,
            events,
            active: None,
        }
    }

    /// Whether a session is currently live.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the device and begin accumulating chunks.
    ///
    /// Emits [`WorkflowEvent::CaptureStarted`] on success, then
    /// [`WorkflowEvent::CaptureElapsed`] once per second until the session
    /// stops.
    ///
    /// # Errors
    ///
    /// [`CaptureError::AlreadyCapturing`] while a session is live;
    /// [`CaptureError::DeviceUnavailable`] when acquisition fails (in which
    /// case no partial session remains).
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let (tx, mut rx) = mpsc::channel::<Bytes>(CHUNK_CHANNEL_CAPACITY);
        let stream = self.backend.acquire(&self.profile, tx).await?;

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let buffer = Arc::clone(&chunks);
        let accumulator = TaskGuard::spawn(async move {
            // Single consumer; arrival order is append order.
            while let Some(chunk) = rx.recv().await {
                buffer.lock().unwrap().push(chunk);
            }
        });

        let started_at = Instant::now();
        let ticker_events = self.events.clone();
        let ticker = TaskGuard::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // the immediate first tick
            loop {
                interval.tick().await;
                ticker_events.emit(WorkflowEvent::CaptureElapsed {
                    display: format_elapsed(started_at.elapsed()),
                });
            }
        });

        self.active = Some(ActiveSession {
            stream,
            chunks,
            accumulator,
            ticker,
        });
        log::info!("capture: session started");
        self.events.emit(WorkflowEvent::CaptureStarted);
        Ok(())
    }

    /// End the session and finalize the collected chunks into one clip.
    ///
    /// The device is released before finalization is attempted, so a
    /// [`CaptureError::Finalize`] error never leaves the device held.  Zero
    /// collected chunks is legal and produces a minimal clip.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NotCapturing`] with no live session;
    /// [`CaptureError::Finalize`] when encoding fails.
    pub async fn stop(&mut self) -> Result<AudioArtifact, CaptureError> {
        let session = self.active.take().ok_or(CaptureError::NotCapturing)?;

        drop(session.ticker);

        // Releases the device and closes the chunk channel.
        let encoder = session.stream.release();
        log::info!("capture: device released");
        self.events.emit(WorkflowEvent::CaptureStopped);

        // Drain whatever was still in flight when the stream ended.
        session.accumulator.join().await;
        let chunks = std::mem::take(&mut *session.chunks.lock().unwrap());

        let clip = encoder.encode(&chunks)?;
        log::debug!(
            "capture: finalized {} chunks into {} bytes",
            chunks.len(),
            clip.len()
        );
        Ok(AudioArtifact::new(clip, encoder.media_type().to_string()))
    }
}

// ---------------------------------------------------------------------------
// Elapsed-time display
// ---------------------------------------------------------------------------

/// Format an elapsed duration as `mm:ss`, both fields zero-padded.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
