//! Notice repository port.
//!
//! Defines the contract for persisting and reading notification rows.
//! Handlers only call `insert_notice`; the read side serves the inbox.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, NotificationId};
use crate::domain::notification::{Notification, NotificationStatus};

/// Repository port for notification persistence.
///
/// Implementations provide their own connection-level concurrency safety;
/// the dispatcher may call `insert_notice` from several workers at once.
#[async_trait]
pub trait NoticeRepository: Send + Sync {
    /// Insert a new notification and return its assigned id.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert_notice(&self, notification: &Notification)
        -> Result<NotificationId, DomainError>;

    /// Find a notification by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, DomainError>;

    /// List notifications for an account, newest first.
    ///
    /// `status` narrows the result to one read state when given.
    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<NotificationStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError>;

    /// Change the read state of a notification.
    ///
    /// # Errors
    ///
    /// - `NotificationNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
    ) -> Result<(), DomainError>;

    /// Count unread notifications for an account.
    async fn unread_count(&self, account_id: AccountId) -> Result<u64, DomainError>;
}
