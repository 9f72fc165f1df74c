//! Engine configuration.
//!
//! `EngineConfig` is the caller-facing configuration surface: retry and
//! backoff constants, default autopilot settings, and backend options.
//! Loaded from TOML with full defaults, validated before use.

mod settings;

pub use settings::{AutopilotSettings, BackendSettings, EngineConfig, RetrySettings};
