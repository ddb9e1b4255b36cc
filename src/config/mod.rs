//! Configuration module for voice-morph.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the remote
//! service and capture profile, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod settings;

pub use settings::{AppConfig, CaptureConfig, RemoteConfig};
