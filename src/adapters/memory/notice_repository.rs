//! In-memory implementation of NoticeRepository.
//!
//! Used by tests and local runs without a database. Ids are assigned from
//! a counter starting at 1, like a serial column.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, NotificationId, Timestamp};
use crate::domain::notification::{Notification, NotificationStatus};
use crate::ports::NoticeRepository;

/// Notification store kept in a vector, in insertion order.
#[derive(Default)]
pub struct InMemoryNoticeRepository {
    rows: RwLock<Vec<Notification>>,
    next_id: AtomicI64,
}

impl InMemoryNoticeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored notification (for test assertions).
    pub async fn all(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl NoticeRepository for InMemoryNoticeRepository {
    async fn insert_notice(
        &self,
        notification: &Notification,
    ) -> Result<NotificationId, DomainError> {
        let id = NotificationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut row = notification.clone();
        row.id = Some(id);
        self.rows.write().await.push(row);
        Ok(id)
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|n| n.id == Some(id))
            .cloned())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<NotificationStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Notification> = rows
            .iter()
            .filter(|n| n.account_id == account_id)
            .filter(|n| status.map_or(true, |s| n.status == s))
            .cloned()
            .collect();

        // Newest first; later inserts win ties
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.as_datetime().cmp(a.created_at.as_datetime()));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|n| n.id == Some(id))
            .ok_or_else(|| {
                DomainError::new(ErrorCode::NotificationNotFound, "Notification not found")
                    .with_detail("id", id.to_string())
            })?;
        row.status = status;
        row.updated_at = Timestamp::now();
        Ok(())
    }

    async fn unread_count(&self, account_id: AccountId) -> Result<u64, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|n| n.account_id == account_id && n.is_unread())
            .count() as u64)
    }
}
