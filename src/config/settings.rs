use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{EngineError, Result};
use crate::executor::RetryConfig;
use crate::planner::PlanMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetrySettings,
    pub autopilot: AutopilotSettings,
    pub backend: BackendSettings,
}

impl EngineConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.retry.max_attempts == 0 {
            errors.push("retry.max_attempts must be greater than 0");
        }
        if self.retry.multiplier < 1.0 {
            errors.push("retry.multiplier must be at least 1.0");
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            errors.push("retry.max_delay_ms must not be less than retry.base_delay_ms");
        }
        if self.backend.timeout_secs == 0 {
            errors.push("backend.timeout_secs must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Config(errors.join("; ")))
        }
    }
}

/// Retry and backoff constants, exposed rather than hardcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotSettings {
    pub max_iterations: u32,
    pub mode: PlanMode,
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            mode: PlanMode::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            model: "demo".to_string(),
            timeout_secs: 120,
        }
    }
}
