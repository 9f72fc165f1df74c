//! Action execution.
//!
//! Runs one action end-to-end: backend attempts with exponential backoff,
//! template fallback on exhaustion or fatal failure, then atomic effect
//! application. Retryable failures never leave this module; the world
//! state either gains the full effect or stays byte-for-byte unchanged.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::backend::{BackendClient, BackendError, GenerationPayload, TemplateFallback};
use crate::error::Result;
use crate::state::{WorldState, WorldStore};

/// Retry and backoff policy for backend attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total backend attempts per action invocation, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Upper bound on any single delay, server hints included.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Backoff delay following the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.base_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

/// How an action produced its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecOutcome {
    /// The backend produced the payload, possibly after retries.
    Backend,
    /// Retries were exhausted or the backend failed fatally; the template
    /// fallback produced a degraded payload.
    Fallback,
}

/// Record of one completed action execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action_id: String,
    pub outcome: ExecOutcome,
    /// Backend attempts that failed before the payload was produced.
    pub retries_attempted: u32,
    pub payload: GenerationPayload,
    pub state_before: WorldState,
    pub state_after: WorldState,
}

/// Runs actions against the backend and applies their effects.
pub struct Executor {
    backend: Arc<dyn BackendClient>,
    fallback: TemplateFallback,
    retry: RetryConfig,
}

impl Executor {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            fallback: TemplateFallback::new(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Execute one action and apply its effect to the store.
    ///
    /// The only error this returns is a world-state validation failure,
    /// which indicates a bug in the action's effect definition. Backend
    /// trouble is absorbed here: the fallback generator is total, so a
    /// payload always exists by the time the effect is applied.
    pub async fn execute(&self, action: &Action, store: &WorldStore) -> Result<ActionRecord> {
        let state_before = store.snapshot();
        let (payload, outcome, retries_attempted) =
            self.generate(action, &state_before).await;

        let state_after = store.apply(action.effect())?;
        info!(
            action_id = action.id(),
            ?outcome,
            retries_attempted,
            degraded = payload.degraded,
            "Action executed"
        );

        Ok(ActionRecord {
            action_id: action.id().to_string(),
            outcome,
            retries_attempted,
            payload,
            state_before,
            state_after,
        })
    }

    /// Produce a payload: sequential backend attempts with backoff, then
    /// the template fallback. Returns the payload, how it was produced,
    /// and the number of failed backend attempts.
    async fn generate(
        &self,
        action: &Action,
        snapshot: &WorldState,
    ) -> (GenerationPayload, ExecOutcome, u32) {
        let mut failed_attempts = 0;

        while failed_attempts < self.retry.max_attempts {
            match action
                .executor()
                .attempt(action.id(), snapshot, self.backend.as_ref())
                .await
            {
                Ok(payload) => return (payload, ExecOutcome::Backend, failed_attempts),

                Err(BackendError::Fatal(reason)) => {
                    warn!(
                        action_id = action.id(),
                        %reason,
                        "Fatal backend failure, using template fallback"
                    );
                    let payload = self.fallback.render(action.id(), snapshot);
                    return (payload, ExecOutcome::Fallback, failed_attempts + 1);
                }

                Err(BackendError::Retryable(reason)) => {
                    let delay = reason
                        .retry_after()
                        .unwrap_or_else(|| self.retry.delay_for(failed_attempts))
                        .min(self.retry.max_delay);
                    failed_attempts += 1;
                    debug!(
                        action_id = action.id(),
                        %reason,
                        failed_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable backend failure, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }

        warn!(
            action_id = action.id(),
            attempts = failed_attempts,
            "Backend exhausted, using template fallback"
        );
        let payload = self.fallback.render(action.id(), snapshot);
        (payload, ExecOutcome::Fallback, failed_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let retry = RetryConfig {
            max_delay: Duration::from_millis(250),
            ..RetryConfig::default()
        };
        assert_eq!(retry.delay_for(2), Duration::from_millis(250));
        assert_eq!(retry.delay_for(10), Duration::from_millis(250));
    }
}
