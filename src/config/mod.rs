//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `NOTICE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use notice::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Starting {} workers", config.dispatcher.worker_count);
//! ```

mod database;
mod dispatch;
mod error;
mod logging;
mod queue;

pub use database::DatabaseConfig;
pub use dispatch::DispatchConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use queue::{QueueBackend, QueueConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Worker pool and retry settings
    #[serde(default)]
    pub dispatcher: DispatchConfig,

    /// Queue backend selection
    #[serde(default)]
    pub queue: QueueConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `NOTICE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `NOTICE__DATABASE__URL=...` -> `database.url = ...`
    /// - `NOTICE__DISPATCHER__WORKER_COUNT=8` -> `dispatcher.worker_count = 8`
    /// - `NOTICE__QUEUE__BACKEND=redis` -> `queue.backend = redis`
    /// - `NOTICE__QUEUE__EXTRA__ADDR=localhost:6379` -> `queue.extra["addr"]`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types (including unknown backends)
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NOTICE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.dispatcher.validate()?;
        self.queue.validate()?;
        Ok(())
    }
}
