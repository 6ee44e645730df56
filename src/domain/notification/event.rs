//! Notification events raised by upstream business logic.
//!
//! An event carries the originating account, its causal context and the
//! moment it occurred, plus a kind-specific payload. The kind is derived
//! from the payload variant, so it cannot drift after construction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AccountId, DomainError, EventId, EventMetadata, Timestamp};

/// Discriminant used to route an event to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "manuscript")]
    ManuscriptAudit,
    #[serde(rename = "award")]
    Award,
}

impl EventKind {
    /// Stable routing name, also used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ManuscriptAudit => "manuscript",
            EventKind::Award => "award",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a manuscript review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptAuditPayload {
    pub manuscript_id: String,
    pub old_status: i8,
    pub new_status: i8,
    #[serde(default)]
    pub audit_reason: String,
    #[serde(default)]
    pub operate_user: String,
    #[serde(default)]
    pub activity_name: String,
}

impl ManuscriptAuditPayload {
    /// Creates a payload with the mandatory status transition.
    pub fn new(manuscript_id: impl Into<String>, old_status: i8, new_status: i8) -> Self {
        Self {
            manuscript_id: manuscript_id.into(),
            old_status,
            new_status,
            audit_reason: String::new(),
            operate_user: String::new(),
            activity_name: String::new(),
        }
    }

    pub fn with_audit_reason(mut self, reason: impl Into<String>) -> Self {
        self.audit_reason = reason.into();
        self
    }

    pub fn with_operate_user(mut self, operator: impl Into<String>) -> Self {
        self.operate_user = operator.into();
        self
    }

    pub fn with_activity_name(mut self, activity_name: impl Into<String>) -> Self {
        self.activity_name = activity_name.into();
        self
    }
}

/// A reward granted for a manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardPayload {
    pub manuscript_id: String,
    pub award_amount: i64,
    #[serde(default)]
    pub award_type: String,
    #[serde(default)]
    pub activity_name: String,
}

impl AwardPayload {
    /// Creates a payload with the granted amount and its type.
    pub fn new(
        manuscript_id: impl Into<String>,
        award_amount: i64,
        award_type: impl Into<String>,
    ) -> Self {
        Self {
            manuscript_id: manuscript_id.into(),
            award_amount,
            award_type: award_type.into(),
            activity_name: String::new(),
        }
    }

    pub fn with_activity_name(mut self, activity_name: impl Into<String>) -> Self {
        self.activity_name = activity_name.into();
        self
    }
}

/// Kind-specific data of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    #[serde(rename = "manuscript")]
    ManuscriptAudit(ManuscriptAuditPayload),
    #[serde(rename = "award")]
    Award(AwardPayload),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::ManuscriptAudit(_) => EventKind::ManuscriptAudit,
            EventPayload::Award(_) => EventKind::Award,
        }
    }
}

/// Immutable record describing a business occurrence to be turned into a notification.
///
/// The causal context is an [`EventMetadata`]; producers may attach it with
/// [`NotificationEvent::with_metadata`] before handing the event to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    event_id: EventId,
    account_id: AccountId,
    occurred_at: Timestamp,
    #[serde(default)]
    metadata: EventMetadata,
    payload: EventPayload,
}

impl NotificationEvent {
    /// Creates an event stamped with a fresh id and the current time.
    pub fn new(account_id: AccountId, payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            account_id,
            occurred_at: Timestamp::now(),
            metadata: EventMetadata::default(),
            payload,
        }
    }

    /// Creates a manuscript audit event.
    pub fn manuscript_audit(account_id: AccountId, payload: ManuscriptAuditPayload) -> Self {
        Self::new(account_id, EventPayload::ManuscriptAudit(payload))
    }

    /// Creates an award event.
    pub fn award(account_id: AccountId, payload: AwardPayload) -> Self {
        Self::new(account_id, EventPayload::Award(payload))
    }

    /// Attaches the causal context.
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Returns the manuscript audit payload, if this is a manuscript audit event.
    pub fn as_manuscript_audit(&self) -> Option<&ManuscriptAuditPayload> {
        match &self.payload {
            EventPayload::ManuscriptAudit(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the award payload, if this is an award event.
    pub fn as_award(&self) -> Option<&AwardPayload> {
        match &self.payload {
            EventPayload::Award(p) => Some(p),
            _ => None,
        }
    }

    /// Encodes the event for remote transports.
    pub fn to_json(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an event produced by [`NotificationEvent::to_json`].
    pub fn from_json(data: &str) -> Result<Self, DomainError> {
        Ok(serde_json::from_str(data)?)
    }
}
