//! ManuscriptAuditHandler - Turns a manuscript review outcome into a notice.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::notification::{
    AuditStatus, EventKind, ManuscriptAuditPayload, Notification, NotificationEvent,
    NotificationType,
};
use crate::ports::{EventHandler, NoticeRepository};

/// Handler for `EventKind::ManuscriptAudit` events.
///
/// An event whose status did not change produces no notice.
pub struct ManuscriptAuditHandler {
    repository: Arc<dyn NoticeRepository>,
}

impl ManuscriptAuditHandler {
    pub fn new(repository: Arc<dyn NoticeRepository>) -> Self {
        Self { repository }
    }

    /// Builds the unread notice for a status change.
    pub fn build_notice(
        event: &NotificationEvent,
        audit: &ManuscriptAuditPayload,
    ) -> Result<Notification, DomainError> {
        let status_text = AuditStatus::describe(audit.new_status);
        let title = format!("稿件审核{}", status_text);

        let mut content = format!(
            "您在活动【{}】提交的稿件已{}",
            audit.activity_name, status_text
        );
        if audit.new_status == AuditStatus::Rejected.code() && !audit.audit_reason.is_empty() {
            content.push_str(&format!("，原因：{}", audit.audit_reason));
        }

        let ext_data = serde_json::to_string(&json!({
            "manuscript_id": audit.manuscript_id,
            "old_status": audit.old_status,
            "new_status": audit.new_status,
            "audit_reason": audit.audit_reason,
            "operate_user": audit.operate_user,
            "activity_name": audit.activity_name,
        }))?;

        Ok(Notification::unread(
            event.account_id(),
            NotificationType::ManuscriptAudit,
            title,
            content,
            ext_data,
        ))
    }
}

#[async_trait]
impl EventHandler for ManuscriptAuditHandler {
    fn supported_kind(&self) -> EventKind {
        EventKind::ManuscriptAudit
    }

    async fn handle(&self, event: &NotificationEvent) -> Result<(), DomainError> {
        let Some(audit) = event.as_manuscript_audit() else {
            tracing::warn!(
                event_id = %event.event_id(),
                event_kind = %event.kind(),
                "Manuscript audit handler received another event shape, skipping"
            );
            return Ok(());
        };

        if audit.new_status == audit.old_status {
            tracing::debug!(
                manuscript_id = %audit.manuscript_id,
                status = audit.new_status,
                "Audit status unchanged, no notice sent"
            );
            return Ok(());
        }

        let notice = Self::build_notice(event, audit)?;
        let id = self.repository.insert_notice(&notice).await?;

        tracing::info!(
            notification_id = %id,
            account_id = %event.account_id(),
            manuscript_id = %audit.manuscript_id,
            old_status = audit.old_status,
            new_status = audit.new_status,
            "Manuscript audit notice created"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ManuscriptAuditHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryNoticeRepository;
    use crate::domain::foundation::{AccountId, ErrorCode, NotificationId};
    use crate::domain::notification::{AwardPayload, NotificationStatus};

    fn audit_event(old_status: i8, new_status: i8, reason: &str) -> NotificationEvent {
        NotificationEvent::manuscript_audit(
            AccountId::new(123456),
            ManuscriptAuditPayload::new("MS001", old_status, new_status)
                .with_audit_reason(reason)
                .with_operate_user("editor01")
                .with_activity_name("2024春季征文大赛"),
        )
    }

    fn handler() -> (ManuscriptAuditHandler, Arc<InMemoryNoticeRepository>) {
        let repo = Arc::new(InMemoryNoticeRepository::new());
        (ManuscriptAuditHandler::new(repo.clone()), repo)
    }

    #[test]
    fn approved_notice_uses_status_label() {
        let event = audit_event(1, 2, "");
        let notice =
            ManuscriptAuditHandler::build_notice(&event, event.as_manuscript_audit().unwrap())
                .unwrap();

        assert_eq!(notice.title, "稿件审核审核通过");
        assert_eq!(notice.content, "您在活动【2024春季征文大赛】提交的稿件已审核通过");
        assert_eq!(notice.notification_type, NotificationType::ManuscriptAudit);
        assert_eq!(notice.status, NotificationStatus::Unread);
        assert_eq!(notice.account_id, AccountId::new(123456));
    }

    #[test]
    fn rejected_notice_appends_reason() {
        let event = audit_event(1, 3, "内容不符合主题");
        let notice =
            ManuscriptAuditHandler::build_notice(&event, event.as_manuscript_audit().unwrap())
                .unwrap();

        assert_eq!(notice.title, "稿件审核审核未通过");
        assert_eq!(
            notice.content,
            "您在活动【2024春季征文大赛】提交的稿件已审核未通过，原因：内容不符合主题"
        );
    }

    #[test]
    fn reason_is_ignored_unless_rejected() {
        let event = audit_event(1, 2, "looks good");
        let notice =
            ManuscriptAuditHandler::build_notice(&event, event.as_manuscript_audit().unwrap())
                .unwrap();
        assert!(!notice.content.contains("原因"));
    }

    #[test]
    fn unknown_status_uses_generic_label() {
        let event = audit_event(1, 9, "");
        let notice =
            ManuscriptAuditHandler::build_notice(&event, event.as_manuscript_audit().unwrap())
                .unwrap();
        assert_eq!(notice.title, "稿件审核状态更新");
    }

    #[test]
    fn ext_data_carries_event_fields() {
        let event = audit_event(1, 3, "重复投稿");
        let notice =
            ManuscriptAuditHandler::build_notice(&event, event.as_manuscript_audit().unwrap())
                .unwrap();

        let ext: serde_json::Value = serde_json::from_str(&notice.ext_data).unwrap();
        assert_eq!(ext["manuscript_id"], "MS001");
        assert_eq!(ext["old_status"], 1);
        assert_eq!(ext["new_status"], 3);
        assert_eq!(ext["audit_reason"], "重复投稿");
        assert_eq!(ext["operate_user"], "editor01");
        assert_eq!(ext["activity_name"], "2024春季征文大赛");
    }

    #[tokio::test]
    async fn handle_persists_notice() {
        let (handler, repo) = handler();

        handler.handle(&audit_event(1, 2, "")).await.unwrap();

        let stored = repo.find_by_id(NotificationId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.title, "稿件审核审核通过");
    }

    #[tokio::test]
    async fn unchanged_status_is_a_no_op() {
        let (handler, repo) = handler();

        handler.handle(&audit_event(2, 2, "")).await.unwrap();

        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn other_event_shape_is_a_no_op() {
        let (handler, repo) = handler();
        let award = NotificationEvent::award(
            AccountId::new(1),
            AwardPayload::new("MS001", 500, "现金奖励"),
        );

        assert!(handler.handle(&award).await.is_ok());
        assert_eq!(repo.count().await, 0);
    }

    struct FailingRepository;

    #[async_trait]
    impl NoticeRepository for FailingRepository {
        async fn insert_notice(&self, _: &Notification) -> Result<NotificationId, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "Simulated insert failure"))
        }

        async fn find_by_id(&self, _: NotificationId) -> Result<Option<Notification>, DomainError> {
            Ok(None)
        }

        async fn list_by_account(
            &self,
            _: AccountId,
            _: Option<NotificationStatus>,
            _: u32,
            _: u32,
        ) -> Result<Vec<Notification>, DomainError> {
            Ok(vec![])
        }

        async fn update_status(
            &self,
            _: NotificationId,
            _: NotificationStatus,
        ) -> Result<(), DomainError> {
            Ok(())
        }

        async fn unread_count(&self, _: AccountId) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn repository_failure_propagates() {
        let handler = ManuscriptAuditHandler::new(Arc::new(FailingRepository));

        let err = handler.handle(&audit_event(1, 2, "")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn reports_kind_and_name() {
        let (handler, _) = handler();
        assert_eq!(handler.supported_kind(), EventKind::ManuscriptAudit);
        assert_eq!(handler.name(), "ManuscriptAuditHandler");
    }
}
