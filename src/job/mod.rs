//! Transformation job submission — remote exchange plus progress estimation.
//!
//! # Timelines
//!
//! ```text
//! submit(clip, params)
//!   ├─ real exchange:  TransformService::transform  ──▶ clip | error
//!   └─ estimator task: +rand(0..15) every 200 ms, capped at 90
//!            │
//!            └─ cancelled (dropped) before the terminal value is published;
//!               success then forces the displayed progress to 100.
//! ```
//!
//! The estimated percentage is a UX approximation — the remote protocol has
//! no granular progress — and must never be read as a correctness signal.

pub mod progress;
pub mod remote;
pub mod runner;

pub use progress::{ProgressCell, ESTIMATE_CEILING};
pub use remote::{HttpTransformService, RemoteError, TransformService};
pub use runner::{JobError, JobRunner, PROGRESS_CADENCE, SETTLE_DELAY};

// test-only re-export so workflow tests can script the remote exchange.
#[cfg(test)]
pub(crate) use remote::mock::MockTransformService;
