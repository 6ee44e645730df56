//! NotificationManager - Producer-facing handle to the event dispatcher.
//!
//! The manager is constructed explicitly and passed to whoever produces
//! events. For call sites that cannot receive it, one handle may be
//! installed process-wide with [`install_global`]; the free functions
//! [`dispatch_manuscript_audit_event`] and [`dispatch_award_event`] use that
//! slot and log-and-drop when nothing is installed.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;

use super::dispatcher::{DispatcherMetrics, EventDispatcher};
use crate::domain::foundation::AccountId;
use crate::domain::notification::{AwardPayload, ManuscriptAuditPayload, NotificationEvent};

static GLOBAL_MANAGER: OnceCell<NotificationManager> = OnceCell::new();

/// Cloneable handle sharing one dispatcher.
#[derive(Clone)]
pub struct NotificationManager {
    dispatcher: Arc<EventDispatcher>,
}

impl NotificationManager {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Hands `event` to the dispatcher. Never fails from the caller's view.
    pub async fn dispatch(&self, event: NotificationEvent) {
        self.dispatcher.dispatch(event).await;
    }

    /// Builds and dispatches a manuscript audit event.
    #[allow(clippy::too_many_arguments)]
    pub async fn dispatch_manuscript_audit_event(
        &self,
        account_id: AccountId,
        manuscript_id: impl Into<String>,
        old_status: i8,
        new_status: i8,
        audit_reason: impl Into<String>,
        operate_user: impl Into<String>,
        activity_name: impl Into<String>,
    ) {
        let payload = ManuscriptAuditPayload::new(manuscript_id, old_status, new_status)
            .with_audit_reason(audit_reason)
            .with_operate_user(operate_user)
            .with_activity_name(activity_name);
        self.dispatch(NotificationEvent::manuscript_audit(account_id, payload))
            .await;
    }

    /// Builds and dispatches an award event.
    pub async fn dispatch_award_event(
        &self,
        account_id: AccountId,
        manuscript_id: impl Into<String>,
        award_amount: i64,
        award_type: impl Into<String>,
        activity_name: impl Into<String>,
    ) {
        let payload = AwardPayload::new(manuscript_id, award_amount, award_type)
            .with_activity_name(activity_name);
        self.dispatch(NotificationEvent::award(account_id, payload))
            .await;
    }

    /// Stops the dispatcher; later calls are no-ops.
    pub async fn stop(&self) {
        self.dispatcher.stop().await;
    }

    /// Key-value snapshot of queue occupancy and delivery counters.
    pub fn metrics(&self) -> HashMap<&'static str, u64> {
        let DispatcherMetrics {
            dispatched,
            dropped,
            unhandled,
            succeeded,
            retried,
            terminal_losses,
            panics,
        } = self.dispatcher.metrics();

        HashMap::from([
            ("event_channel_len", self.dispatcher.queue_len() as u64),
            ("event_channel_cap", self.dispatcher.queue_capacity() as u64),
            ("dispatched", dispatched),
            ("dropped", dropped),
            ("unhandled", unhandled),
            ("succeeded", succeeded),
            ("retried", retried),
            ("terminal_losses", terminal_losses),
            ("panics", panics),
        ])
    }
}

/// Installs `manager` as the process-wide instance.
///
/// The first install wins; later calls leave it in place and return the
/// installed handle.
pub fn install_global(manager: NotificationManager) -> NotificationManager {
    let mut installed_now = false;
    let installed = GLOBAL_MANAGER.get_or_init(|| {
        installed_now = true;
        manager
    });

    if installed_now {
        tracing::info!("Global notification manager installed");
    } else {
        tracing::debug!("Global notification manager already installed, keeping it");
    }
    installed.clone()
}

/// The process-wide instance, if one was installed.
pub fn global() -> Option<&'static NotificationManager> {
    GLOBAL_MANAGER.get()
}

/// Dispatches a manuscript audit event through the global manager.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch_manuscript_audit_event(
    account_id: AccountId,
    manuscript_id: impl Into<String>,
    old_status: i8,
    new_status: i8,
    audit_reason: impl Into<String>,
    operate_user: impl Into<String>,
    activity_name: impl Into<String>,
) {
    let Some(manager) = global() else {
        tracing::warn!(
            account_id = %account_id,
            event_kind = "manuscript",
            "Notification manager not initialised, dropping event"
        );
        return;
    };
    manager
        .dispatch_manuscript_audit_event(
            account_id,
            manuscript_id,
            old_status,
            new_status,
            audit_reason,
            operate_user,
            activity_name,
        )
        .await;
}

/// Dispatches an award event through the global manager.
pub async fn dispatch_award_event(
    account_id: AccountId,
    manuscript_id: impl Into<String>,
    award_amount: i64,
    award_type: impl Into<String>,
    activity_name: impl Into<String>,
) {
    let Some(manager) = global() else {
        tracing::warn!(
            account_id = %account_id,
            event_kind = "award",
            "Notification manager not initialised, dropping event"
        );
        return;
    };
    manager
        .dispatch_award_event(account_id, manuscript_id, award_amount, award_type, activity_name)
        .await;
}
