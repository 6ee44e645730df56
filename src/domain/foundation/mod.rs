//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, event context and error types
//! that form the vocabulary of the notice domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use events::{EventId, EventMetadata};
pub use ids::{AccountId, NotificationId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
