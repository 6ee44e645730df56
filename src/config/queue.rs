//! Message queue backend configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use super::error::ValidationError;

/// Transport selected for the dispatcher queue
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Bounded in-process buffer
    #[default]
    Channel,
    /// Remote list-based queue (not implemented)
    Redis,
    /// Log broker topic (not implemented)
    Kafka,
}

impl QueueBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueBackend::Channel => "channel",
            QueueBackend::Redis => "redis",
            QueueBackend::Kafka => "kafka",
        }
    }
}

impl fmt::Display for QueueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Backend type: `channel`, `redis` or `kafka`
    #[serde(default)]
    pub backend: QueueBackend,

    /// Buffer size (hard bound for `channel`, reported capacity otherwise)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Backend-specific settings (address, credentials, topic, ...)
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl QueueConfig {
    /// In-memory queue with the given capacity.
    pub fn channel(buffer_size: usize) -> Self {
        Self {
            backend: QueueBackend::Channel,
            buffer_size,
            extra: HashMap::new(),
        }
    }

    /// Add a backend-specific setting.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a backend-specific setting, ignoring blank values.
    pub fn extra_value(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Validate queue configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.buffer_size == 0 {
            return Err(ValidationError::InvalidBufferSize);
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::channel(default_buffer_size())
    }
}

fn default_buffer_size() -> usize {
    1000
}
