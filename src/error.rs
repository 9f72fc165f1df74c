use thiserror::Error;

use crate::state::EngineState;

/// Engine-level errors.
///
/// Backend failures (retryable or fatal) never appear here: they are
/// classified by the backend client and fully absorbed inside the executor.
/// `Validation` is the only variant the engine core can surface during a
/// run, and it indicates a bug in an action definition rather than an
/// environment issue.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed for key '{key}': {reason}")]
    Validation { key: String, reason: String },

    #[error("Action already registered: {0}")]
    DuplicateAction(String),

    #[error("Parallel actions '{first}' and '{second}' both write key '{key}'")]
    EffectConflict {
        first: String,
        second: String,
        key: String,
    },

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Invalid engine state transition: {from} -> {to}")]
    InvalidTransition {
        from: EngineState,
        to: EngineState,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl EngineError {
    pub fn validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
