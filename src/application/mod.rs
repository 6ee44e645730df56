//! Application layer - Event dispatch and notice handlers.
//!
//! - `dispatcher` - Worker pool, retry policy and lifecycle
//! - `manager` - Producer-facing handle and optional process-wide slot
//! - `handlers` - One `EventHandler` per event kind

pub mod dispatcher;
pub mod handlers;
pub mod manager;

pub use dispatcher::{
    DispatcherConfig, DispatcherMetrics, DispatcherStatus, EventDispatcher, HandlerFailure,
    RetryPolicy,
};
pub use handlers::{AwardHandler, ManuscriptAuditHandler};
pub use manager::{
    dispatch_award_event, dispatch_manuscript_audit_event, global, install_global,
    NotificationManager,
};
