//! PostgreSQL implementation of NoticeRepository.
//!
//! Stores notifications in `tbl_notification` using sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, NotificationId, Timestamp};
use crate::domain::notification::{Notification, NotificationStatus, NotificationType};
use crate::ports::NoticeRepository;

/// PostgreSQL implementation of the NoticeRepository port.
pub struct PostgresNoticeRepository {
    pool: PgPool,
}

impl PostgresNoticeRepository {
    /// Creates a new PostgresNoticeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a notification.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    account_id: i64,
    #[sqlx(rename = "type")]
    notification_type: i16,
    title: String,
    content: String,
    status: i16,
    ext_data: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let notification_type = NotificationType::from_code(row.notification_type).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid type value: {}", e))
        })?;
        let status = NotificationStatus::from_code(row.status).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", e))
        })?;

        Ok(Notification {
            id: Some(NotificationId::new(row.id)),
            account_id: AccountId::new(row.account_id),
            notification_type,
            title: row.title,
            content: row.content,
            status,
            ext_data: row.ext_data,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl NoticeRepository for PostgresNoticeRepository {
    async fn insert_notice(
        &self,
        notification: &Notification,
    ) -> Result<NotificationId, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tbl_notification (
                account_id, type, title, content, status, ext_data, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(notification.account_id.as_i64())
        .bind(notification.notification_type.code())
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.status.code())
        .bind(&notification.ext_data)
        .bind(notification.created_at.as_datetime())
        .bind(notification.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to insert notice: {}", e))
                .with_detail("account_id", notification.account_id.to_string())
        })?;

        Ok(NotificationId::new(id))
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, DomainError> {
        let row: Option<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, type, title, content, status, ext_data, created_at, updated_at
            FROM tbl_notification
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find notice: {}", e))
        })?;

        row.map(Notification::try_from).transpose()
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<NotificationStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, type, title, content, status, ext_data, created_at, updated_at
            FROM tbl_notification
            WHERE account_id = $1
              AND ($2::SMALLINT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(account_id.as_i64())
        .bind(status.map(|s| s.code()))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list notices: {}", e))
        })?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tbl_notification
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(status.code())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update notice status: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(
                DomainError::new(ErrorCode::NotificationNotFound, "Notification not found")
                    .with_detail("id", id.to_string()),
            );
        }

        Ok(())
    }

    async fn unread_count(&self, account_id: AccountId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tbl_notification
            WHERE account_id = $1 AND status = $2
            "#,
        )
        .bind(account_id.as_i64())
        .bind(NotificationStatus::Unread.code())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to count unread notices: {}", e))
        })?;

        Ok(count.max(0) as u64)
    }
}
