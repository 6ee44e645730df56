//! Event dispatcher configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::{DispatcherConfig, RetryPolicy};

/// Worker pool and retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Number of worker loops
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// How long `dispatch` waits for queue capacity, in seconds
    #[serde(default = "default_push_timeout")]
    pub push_timeout_secs: u64,

    /// Handler attempts per event
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n` units
    #[serde(default = "default_backoff_step")]
    pub backoff_step_ms: u64,
}

impl DispatchConfig {
    /// Get push timeout as Duration
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    /// Get backoff step as Duration
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    /// Runtime settings for the dispatcher
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::default()
            .with_worker_count(self.worker_count)
            .with_push_timeout(self.push_timeout())
            .with_retry(RetryPolicy::new(self.max_attempts, self.backoff_step()))
    }

    /// Validate dispatcher configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_count == 0 {
            return Err(ValidationError::InvalidWorkerCount);
        }
        if self.push_timeout_secs == 0 || self.push_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            push_timeout_secs: default_push_timeout(),
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step(),
        }
    }
}

fn default_worker_count() -> usize {
    5
}

fn default_push_timeout() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step() -> u64 {
    1000
}
