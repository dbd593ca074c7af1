// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the engine, the storage backends and the gateway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum body length, in characters.
pub const MAX_BODY_CHARS: usize = 1000;

/// Globally unique identifier for a message. Assigned once, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier by which the live-channel transport addresses one open connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelHandle(pub String);

impl ChannelHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter plugged into the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Transport,
    Identity,
}

/// Informational tag on a message. Has no behavioral effect on routing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    System,
    User,
    Alert,
    #[default]
    Info,
    Warning,
    Error,
}

/// Delivery lifecycle of a message.
///
/// Legal moves: `Pending -> Delivered`, `Pending -> Failed`, `Delivered -> Read`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        matches!(
            (self, next),
            (MessageStatus::Pending, MessageStatus::Delivered)
                | (MessageStatus::Pending, MessageStatus::Failed)
                | (MessageStatus::Delivered, MessageStatus::Read)
        )
    }
}

/// Content of a message before the engine assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub title: String,
    pub body: String,
    pub category: Category,
    pub sender_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    /// Relative expiry. `None` means the default retention window applies.
    pub expires_in: Option<Duration>,
}

impl MessageDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category: Category::default(),
            sender_id: None,
            payload: None,
            expires_in: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

/// A notification addressed to exactly one recipient.
///
/// Content is immutable once created; only the status fields move, and only forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Build a `Pending` message for `recipient_id` from a draft.
    pub fn new(recipient_id: impl Into<String>, draft: &MessageDraft, now: DateTime<Utc>) -> Self {
        let expires_at = draft
            .expires_in
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MAX_UTC));
        Self {
            id: MessageId::generate(),
            recipient_id: recipient_id.into(),
            sender_id: draft.sender_id.clone(),
            title: draft.title.clone(),
            body: draft.body.clone(),
            category: draft.category,
            status: MessageStatus::Pending,
            payload: draft.payload.clone(),
            created_at: now,
            delivered_at: None,
            read_at: None,
            expires_at,
        }
    }

    /// Move to `Delivered`. Returns `false` (and changes nothing) if illegal.
    ///
    /// `delivered_at` is clamped to be no earlier than `created_at`.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(MessageStatus::Delivered) {
            return false;
        }
        self.status = MessageStatus::Delivered;
        self.delivered_at = Some(at.max(self.created_at));
        true
    }

    /// Move to `Read`. Only reachable from `Delivered`.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(MessageStatus::Read) {
            return false;
        }
        let floor = self.delivered_at.unwrap_or(self.created_at);
        self.status = MessageStatus::Read;
        self.read_at = Some(at.max(floor));
        true
    }

    /// Move to `Failed`. Only reachable from `Pending`.
    pub fn mark_failed(&mut self) -> bool {
        if !self.status.can_transition_to(MessageStatus::Failed) {
            return false;
        }
        self.status = MessageStatus::Failed;
        true
    }

    /// Whether the message carries an explicit expiry that has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Current reachable channel of a user. At most one per user; last writer wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub user_id: String,
    pub channel_handle: ChannelHandle,
    pub connected_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Result of routing one message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum RouteOutcome {
    /// Handed to the transport for a channel believed live. Not a receipt.
    Delivered,
    /// Appended to the recipient's backlog.
    Queued,
    /// Neither delivered nor queued; the caller must retry to avoid loss.
    Failed { reason: String },
}

/// A recipient that ended up in the delivered or queued bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedRecipient {
    pub recipient_id: String,
    pub message_id: MessageId,
}

/// A recipient whose message could be neither delivered nor queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecipient {
    pub recipient_id: String,
    pub message_id: MessageId,
    pub reason: String,
}

/// Aggregate outcome of a batch send. Every requested recipient lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub delivered: Vec<RoutedRecipient>,
    pub queued: Vec<RoutedRecipient>,
    pub failed: Vec<FailedRecipient>,
}

impl BatchReport {
    /// File one recipient's outcome into the matching bucket.
    pub fn record(&mut self, recipient_id: String, message_id: MessageId, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::Delivered => self.delivered.push(RoutedRecipient {
                recipient_id,
                message_id,
            }),
            RouteOutcome::Queued => self.queued.push(RoutedRecipient {
                recipient_id,
                message_id,
            }),
            RouteOutcome::Failed { reason } => self.failed.push(FailedRecipient {
                recipient_id,
                message_id,
                reason,
            }),
        }
    }

    /// Sum of the three buckets. Equals `total` for every well-formed report.
    pub fn accounted(&self) -> usize {
        self.delivered.len() + self.queued.len() + self.failed.len()
    }

    /// Outcome recorded for `recipient_id`, if any.
    pub fn outcome_for(&self, recipient_id: &str) -> Option<RouteOutcome> {
        if self.delivered.iter().any(|r| r.recipient_id == recipient_id) {
            return Some(RouteOutcome::Delivered);
        }
        if self.queued.iter().any(|r| r.recipient_id == recipient_id) {
            return Some(RouteOutcome::Queued);
        }
        self.failed
            .iter()
            .find(|r| r.recipient_id == recipient_id)
            .map(|r| RouteOutcome::Failed {
                reason: r.reason.clone(),
            })
    }
}

/// Result of a `markRead` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum MarkReadOutcome {
    Marked { read_at: DateTime<Utc> },
    AlreadyRead,
    /// Still `Pending` or `Failed`; nothing was changed and `readAt` stays unset.
    NotDelivered { status: MessageStatus },
    NotFound,
    /// The reader is not the message's recipient.
    Forbidden,
}

/// Identity produced by a successful credential verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: Option<String>,
}
