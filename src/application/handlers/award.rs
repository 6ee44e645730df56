//! AwardHandler - Turns a granted reward into a notice.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::notification::{
    AwardPayload, EventKind, Notification, NotificationEvent, NotificationType,
};
use crate::ports::{EventHandler, NoticeRepository};

const AWARD_TITLE: &str = "奖励发放通知";

/// Handler for `EventKind::Award` events.
pub struct AwardHandler {
    repository: Arc<dyn NoticeRepository>,
}

impl AwardHandler {
    pub fn new(repository: Arc<dyn NoticeRepository>) -> Self {
        Self { repository }
    }

    /// Builds the unread notice for a reward.
    ///
    /// Amount and type are only mentioned when present.
    pub fn build_notice(
        event: &NotificationEvent,
        award: &AwardPayload,
    ) -> Result<Notification, DomainError> {
        let mut content = format!(
            "恭喜您！您在活动【{}】的稿件获得奖励",
            award.activity_name
        );
        if award.award_amount > 0 {
            content.push_str(&format!("，金额：{}", award.award_amount));
        }
        if !award.award_type.is_empty() {
            content.push_str(&format!("，类型：{}", award.award_type));
        }

        let ext_data = serde_json::to_string(&json!({
            "manuscript_id": award.manuscript_id,
            "award_type": award.award_type,
            "award_amount": award.award_amount,
            "activity_name": award.activity_name,
        }))?;

        Ok(Notification::unread(
            event.account_id(),
            NotificationType::RewardDistribution,
            AWARD_TITLE,
            content,
            ext_data,
        ))
    }
}

#[async_trait]
impl EventHandler for AwardHandler {
    fn supported_kind(&self) -> EventKind {
        EventKind::Award
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), DomainError> {
        let Some(award) = event.as_award() else {
            tracing::warn!(
                event_id = %event.event_id(),
                event_kind = %event.kind(),
                "Award handler received another event shape, skipping"
            );
            return Ok(());
        };

        let notice = Self::build_notice(event, award)?;
        let id = self.repository.insert_notice(&notice).await?;

        tracing::info!(
            notification_id = %id,
            account_id = %event.account_id(),
            manuscript_id = %award.manuscript_id,
            award_amount = award.award_amount,
            "Award notice created"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AwardHandler"
    }
}
