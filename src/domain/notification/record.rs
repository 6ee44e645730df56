//! Persisted notification record and its code tables.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, DomainError, NotificationId, Timestamp};

/// Category of a notification, stored as a small integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// 稿件审核通知
    ManuscriptAudit,
    /// 认证审核通知
    CertificationAudit,
    /// 奖励发放通知
    RewardDistribution,
}

impl NotificationType {
    pub fn code(&self) -> i16 {
        match self {
            NotificationType::ManuscriptAudit => 1,
            NotificationType::CertificationAudit => 2,
            NotificationType::RewardDistribution => 3,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(NotificationType::ManuscriptAudit),
            2 => Ok(NotificationType::CertificationAudit),
            3 => Ok(NotificationType::RewardDistribution),
            other => Err(DomainError::validation(
                "type",
                format!("Unknown notification type code: {}", other),
            )),
        }
    }
}

/// Read state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn code(&self) -> i16 {
        match self {
            NotificationStatus::Unread => 0,
            NotificationStatus::Read => 1,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            0 => Ok(NotificationStatus::Unread),
            1 => Ok(NotificationStatus::Read),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown notification status code: {}", other),
            )),
        }
    }
}

/// A notification row as written to `tbl_notification`.
///
/// `id` is `None` until the repository assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Option<NotificationId>,
    pub account_id: AccountId,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub status: NotificationStatus,
    /// JSON object with the fields of the triggering event.
    pub ext_data: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    /// Creates a new unread notification stamped with the current time.
    pub fn unread(
        account_id: AccountId,
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
        ext_data: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: None,
            account_id,
            notification_type,
            title: title.into(),
            content: content.into(),
            status: NotificationStatus::Unread,
            ext_data: ext_data.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}
