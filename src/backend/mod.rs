//! Generation backend boundary.
//!
//! The engine's only contract with the backend is: submit a structured
//! request, receive a payload or a classified failure. Classification is
//! the client's job; the executor never inspects raw transport errors.

mod demo;
mod fallback;

pub use demo::DemoBackend;
pub use fallback::TemplateFallback;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub action_id: String,
    pub prompt: String,
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(action_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            prompt: prompt.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A successful generation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub content: String,
    pub model: Option<String>,
    /// True when produced by the template fallback rather than the backend.
    pub degraded: bool,
}

impl GenerationPayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            degraded: false,
        }
    }

    pub fn degraded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            degraded: true,
        }
    }
}

/// Transient failure reasons. Retried with backoff.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryReason {
    RateLimited { retry_after: Option<Duration> },
    Timeout(Duration),
    ServerError(String),
}

impl RetryReason {
    /// Server-suggested delay, when the failure carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited, retry after {}s", d.as_secs()),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::Timeout(elapsed) => write!(f, "request timed out after {:?}", elapsed),
            Self::ServerError(msg) => write!(f, "transient server error: {}", msg),
        }
    }
}

/// Permanent failure reasons. Never retried; the executor falls back to
/// template generation immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum FatalReason {
    Auth(String),
    MalformedRequest(String),
}

impl std::fmt::Display for FatalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "authentication failed: {}", msg),
            Self::MalformedRequest(msg) => write!(f, "malformed request: {}", msg),
        }
    }
}

/// Classified backend failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("retryable backend failure: {0}")]
    Retryable(RetryReason),

    #[error("fatal backend failure: {0}")]
    Fatal(FatalReason),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn rate_limited() -> Self {
        Self::Retryable(RetryReason::RateLimited { retry_after: None })
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::Retryable(RetryReason::Timeout(elapsed))
    }

    /// Classify a raw transport message. Only unambiguous, structured
    /// patterns are matched; anything else is treated as a transient
    /// server error, since degrading to the fallback is always safe.
    pub fn from_message(msg: &str) -> Self {
        if msg.contains("429") || msg.contains("Too Many Requests") {
            return Self::Retryable(RetryReason::RateLimited {
                retry_after: extract_retry_after(msg),
            });
        }
        if msg.contains("401") || msg.contains("403") || msg.contains("authentication") {
            return Self::Fatal(FatalReason::Auth(msg.to_string()));
        }
        if msg.contains("400") || msg.contains("invalid_request") {
            return Self::Fatal(FatalReason::MalformedRequest(msg.to_string()));
        }
        if msg.contains("timed out") || msg.contains("timeout") {
            return Self::Retryable(RetryReason::Timeout(Duration::ZERO));
        }
        Self::Retryable(RetryReason::ServerError(msg.to_string()))
    }
}

fn extract_retry_after(msg: &str) -> Option<Duration> {
    let msg_lower = msg.to_lowercase();
    for pattern in ["retry after ", "retry-after: ", "retry_after="] {
        if let Some(idx) = msg_lower.find(pattern) {
            let after_pattern = &msg_lower[idx + pattern.len()..];
            let num_str: String = after_pattern
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(secs) = num_str.parse() {
                return Some(Duration::from_secs(secs));
            }
        }
    }
    None
}

/// A generation backend.
///
/// Implementations own their transport, per-call timeouts, and outcome
/// classification. Test doubles script outcomes per action.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationPayload, BackendError>;
}
