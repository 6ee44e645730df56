//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `queue` - Message queue backends (in-memory channel, remote stubs)
//! - `postgres` - Notification persistence
//! - `memory` - In-memory persistence for tests

pub mod memory;
pub mod postgres;
pub mod queue;

pub use memory::InMemoryNoticeRepository;
pub use postgres::PostgresNoticeRepository;
pub use queue::{new_message_queue, ChannelQueue, KafkaQueueSettings, RedisQueueSettings};
