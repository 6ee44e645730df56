//! Message queue adapters.
//!
//! - `ChannelQueue` - Bounded in-process buffer (the only working backend)
//! - `RedisQueueSettings` / `KafkaQueueSettings` - Remote backends that fail fast at construction

mod channel;
mod kafka_queue;
mod redis_queue;

pub use channel::ChannelQueue;
pub use kafka_queue::KafkaQueueSettings;
pub use redis_queue::RedisQueueSettings;

use std::sync::Arc;

use crate::config::{QueueBackend, QueueConfig};
use crate::ports::{MessageQueue, QueueError};

/// Builds the queue selected by `config`.
///
/// # Errors
///
/// Remote backends return `InvalidSettings` or `Unsupported`; the dispatcher
/// must not be started without a queue.
pub fn new_message_queue(config: &QueueConfig) -> Result<Arc<dyn MessageQueue>, QueueError> {
    match config.backend {
        QueueBackend::Channel => Ok(Arc::new(ChannelQueue::new(config.buffer_size))),
        QueueBackend::Redis => RedisQueueSettings::from_config(config)?.build(),
        QueueBackend::Kafka => KafkaQueueSettings::from_config(config)?.build(),
    }
}
