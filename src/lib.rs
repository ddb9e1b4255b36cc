//! voice-morph — client-side orchestration of an audio transformation job.
//!
//! The crate drives one audio clip from acquisition (file selection or live
//! microphone capture) through a remote transformation request to a processed
//! clip ready for export.  The heart is [`WorkflowOrchestrator`], a state
//! machine composing four collaborators behind explicit seams:
//!
//! ```text
//! ┌─────────────────────────── WorkflowOrchestrator ───────────────────────────┐
//! │                                                                            │
//! │  ParameterStore        CaptureSessionManager        JobRunner              │
//! │  (triple + presets)    (device, chunks, ticker)     (exchange + estimate)  │
//! │        │                        │                        │                 │
//! │        │                        ▼                        ▼                 │
//! │        │                 SourceResolver ──clip──▶ TransformService         │
//! │        │                 (canonical clip)         (remote, multipart)      │
//! │        └────────────────────────┴───────────┬────────────┘                 │
//! │                                             ▼                              │
//! │                                         EventBus ──▶ presentation layer    │
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_morph::capture::MicrophoneBackend;
//! use voice_morph::config::AppConfig;
//! use voice_morph::job::HttpTransformService;
//! use voice_morph::workflow::WorkflowOrchestrator;
//!
//! # async fn example() -> Result<(), voice_morph::workflow::WorkflowError> {
//! let config = AppConfig::load().unwrap_or_default();
//! let mut orchestrator = WorkflowOrchestrator::from_config(
//!     &config,
//!     Arc::new(MicrophoneBackend::new()),
//!     Arc::new(HttpTransformService::from_config(&config.remote)),
//! );
//!
//! let _events = orchestrator.subscribe();
//! orchestrator.start_capture().await?;
//! // ... later ...
//! orchestrator.stop_capture().await?;
//! orchestrator.apply_preset("male-to-female")?;
//! orchestrator.submit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Exactly one clip, one capture session, and one submission are live at any
//! instant; attempts to start a second of either are rejected, not queued.

pub mod capture;
pub mod config;
pub mod events;
pub mod export;
pub mod job;
pub mod params;
pub mod source;
pub mod workflow;

mod task;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use events::{EventBus, WorkflowEvent};
pub use params::TransformParameters;
pub use source::AudioArtifact;
pub use workflow::{WorkflowError, WorkflowOrchestrator, WorkflowState};
