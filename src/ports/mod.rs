//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `EventHandler` - Turns one kind of event into a persisted notification
//! - `MessageQueue` - Bounded transport between producers and workers
//! - `NoticeRepository` - Notification persistence

mod event_handler;
mod message_queue;
mod notice_repository;

pub use event_handler::EventHandler;
pub use message_queue::{MessageQueue, QueueError, ShutdownSignal};
pub use notice_repository::NoticeRepository;
