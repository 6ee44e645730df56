//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, state machine)
//! - `notification` - Notification events, payloads and the persisted record

pub mod foundation;
pub mod notification;
