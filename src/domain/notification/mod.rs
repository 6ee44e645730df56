//! Notification module - events that trigger notifications and the
//! notification record they become.

mod audit_status;
mod event;
mod record;

pub use audit_status::AuditStatus;
pub use event::{
    AwardPayload, EventKind, EventPayload, ManuscriptAuditPayload, NotificationEvent,
};
pub use record::{Notification, NotificationStatus, NotificationType};
