//! EventHandler port - Interface for turning an event into a notification.
//!
//! The dispatcher knows nothing about concrete handler logic: it routes an
//! event by [`EventKind`] to the one handler registered for that kind and
//! only looks at whether `handle` succeeded.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::notification::{EventKind, NotificationEvent};

/// Handler for one kind of notification event.
///
/// Implementations should be:
/// - **Stateless** - `supported_kind` is read once at registration
/// - **Shape tolerant** - an event of the wrong shape is a no-op success
/// - **Retry safe** - a failed invocation may be repeated with the same event
///
/// # Example
///
/// ```ignore
/// struct AwardHandler { repo: Arc<dyn NoticeRepository> }
///
/// #[async_trait]
/// impl EventHandler for AwardHandler {
///     fn supported_kind(&self) -> EventKind {
///         EventKind::Award
///     }
///
///     async fn handle(&self, event: &NotificationEvent) -> Result<(), DomainError> {
///         let Some(award) = event.as_award() else { return Ok(()) };
///         // build and insert the notification...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "AwardHandler"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The event kind this handler is registered under.
    fn supported_kind(&self) -> EventKind;

    /// Process an event.
    ///
    /// Any error is treated the same way by the dispatcher: the attempt
    /// failed and may be retried.
    async fn handle(&self, event: &NotificationEvent) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}
