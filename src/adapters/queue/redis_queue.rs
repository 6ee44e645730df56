//! Redis list queue settings.
//!
//! The transport itself is not implemented: the settings are parsed and
//! validated, then [`RedisQueueSettings::build`] fails fast with
//! `Unsupported` so a misconfigured deployment is caught at wiring time.

use secrecy::SecretString;
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::ports::{MessageQueue, QueueError};

const BACKEND: &str = "redis";
const DEFAULT_ADDR: &str = "127.0.0.1:6379";
const DEFAULT_QUEUE_KEY: &str = "notice:events";

/// Connection settings read from the queue `extra` bag.
#[derive(Debug, Clone)]
pub struct RedisQueueSettings {
    pub addr: String,
    pub password: Option<SecretString>,
    pub db: i64,
    pub queue_key: String,
    pub buffer_size: usize,
}

impl RedisQueueSettings {
    /// Parses `addr`, `password`, `db` and `queue_key`.
    ///
    /// # Errors
    ///
    /// `InvalidSettings` if `db` is not an integer or the address does not
    /// form a valid redis URL.
    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        let addr = config.extra_value("addr").unwrap_or(DEFAULT_ADDR).to_string();

        let db = match config.extra_value("db") {
            Some(raw) => raw.parse::<i64>().map_err(|e| QueueError::InvalidSettings {
                backend: BACKEND,
                reason: format!("db must be an integer: {}", e),
            })?,
            None => 0,
        };

        let url = format!("redis://{}/{}", addr, db);
        redis::Client::open(url.as_str()).map_err(|e| {
            QueueError::InvalidSettings {
                backend: BACKEND,
                reason: format!("invalid address {}: {}", addr, e),
            }
        })?;

        Ok(Self {
            addr,
            password: config
                .extra_value("password")
                .map(|p| SecretString::new(p.to_string())),
            db,
            queue_key: config
                .extra_value("queue_key")
                .unwrap_or(DEFAULT_QUEUE_KEY)
                .to_string(),
            buffer_size: config.buffer_size,
        })
    }

    /// Builds the queue for these settings.
    ///
    /// # Errors
    ///
    /// Always `Unsupported`: the redis transport is not implemented.
    pub fn build(self) -> Result<Arc<dyn MessageQueue>, QueueError> {
        tracing::error!(
            addr = %self.addr,
            db = self.db,
            queue_key = %self.queue_key,
            "Redis queue backend requested but not implemented"
        );
        Err(QueueError::Unsupported { backend: BACKEND })
    }
}
