//! Event handlers - One per notification event kind.
//!
//! Each handler builds the notice text for its event kind and persists it
//! through the `NoticeRepository` port.

mod award;
mod manuscript_audit;

pub use award::AwardHandler;
pub use manuscript_audit::ManuscriptAuditHandler;
