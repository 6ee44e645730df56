//! Kafka topic queue settings.
//!
//! Like the redis variant, the broker transport is not implemented and
//! [`KafkaQueueSettings::build`] fails with `Unsupported` once the settings parse.

use secrecy::SecretString;
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::ports::{MessageQueue, QueueError};

const BACKEND: &str = "kafka";
const DEFAULT_TOPIC: &str = "notice-events";
const DEFAULT_GROUP_ID: &str = "notice-dispatcher";

/// Broker settings read from the queue `extra` bag.
#[derive(Debug, Clone)]
pub struct KafkaQueueSettings {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub version: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl KafkaQueueSettings {
    /// Parses `brokers` (comma separated), `topic`, `group_id`, `version`,
    /// `username` and `password`.
    ///
    /// # Errors
    ///
    /// `InvalidSettings` if no broker is given or a password is set without
    /// a username.
    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        let brokers: Vec<String> = config
            .extra_value("brokers")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if brokers.is_empty() {
            return Err(QueueError::InvalidSettings {
                backend: BACKEND,
                reason: "at least one broker is required".to_string(),
            });
        }

        let username = config.extra_value("username").map(str::to_string);
        let password = config
            .extra_value("password")
            .map(|p| SecretString::new(p.to_string()));
        if password.is_some() && username.is_none() {
            return Err(QueueError::InvalidSettings {
                backend: BACKEND,
                reason: "password given without username".to_string(),
            });
        }

        Ok(Self {
            brokers,
            topic: config
                .extra_value("topic")
                .unwrap_or(DEFAULT_TOPIC)
                .to_string(),
            group_id: config
                .extra_value("group_id")
                .unwrap_or(DEFAULT_GROUP_ID)
                .to_string(),
            version: config.extra_value("version").map(str::to_string),
            username,
            password,
        })
    }

    /// Builds the queue for these settings.
    ///
    /// # Errors
    ///
    /// Always `Unsupported`: the kafka transport is not implemented.
    pub fn build(self) -> Result<Arc<dyn MessageQueue>, QueueError> {
        tracing::error!(
            brokers = ?self.brokers,
            topic = %self.topic,
            group_id = %self.group_id,
            "Kafka queue backend requested but not implemented"
        );
        Err(QueueError::Unsupported { backend: BACKEND })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueBackend;

    fn kafka_config() -> QueueConfig {
        QueueConfig {
            backend: QueueBackend::Kafka,
            ..QueueConfig::default()
        }
    }

    #[test]
    fn brokers_are_required() {
        let err = KafkaQueueSettings::from_config(&kafka_config()).unwrap_err();
        assert!(matches!(err, QueueError::InvalidSettings { backend: "kafka", .. }));
    }

    #[test]
    fn brokers_split_on_commas() {
        let config = kafka_config().with_extra("brokers", "k1:9092, k2:9092,,");
        let settings = KafkaQueueSettings::from_config(&config).unwrap();

        assert_eq!(settings.brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(settings.topic, "notice-events");
        assert_eq!(settings.group_id, "notice-dispatcher");
        assert!(settings.version.is_none());
    }

    #[test]
    fn password_without_username_is_invalid() {
        let config = kafka_config()
            .with_extra("brokers", "k1:9092")
            .with_extra("password", "s3cret");
        assert!(KafkaQueueSettings::from_config(&config).is_err());
    }

    #[test]
    fn valid_settings_still_fail_as_unsupported() {
        let config = kafka_config()
            .with_extra("brokers", "k1:9092")
            .with_extra("topic", "audit")
            .with_extra("username", "notice")
            .with_extra("password", "s3cret");

        assert!(matches!(
            KafkaQueueSettings::from_config(&config).and_then(|s| s.build()),
            Err(QueueError::Unsupported { backend: "kafka" })
        ));
    }
}
