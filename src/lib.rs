//! Notice - Asynchronous notification delivery.
//!
//! Business events (manuscript audit outcomes, award grants) are handed to
//! an [`application::EventDispatcher`], queued, and turned into persisted
//! notices by a pool of workers with bounded retries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
