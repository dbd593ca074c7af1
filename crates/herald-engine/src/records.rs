// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived message records at `message:<id>`, the source of truth for a
//! message's status.
//!
//! Backlog entries are snapshots and never change; status moves happen here.
//! Every transition goes through [`Message`]'s guarded setters, so an illegal
//! move is refused rather than written.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_core::{DurableStore, HeraldError, MarkReadOutcome, Message, MessageId, MessageStatus};
use tracing::debug;

use crate::keys;

pub struct MessageRecords {
    store: Arc<dyn DurableStore>,
    ttl: Duration,
}

impl MessageRecords {
    pub fn new(store: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Write a fresh record with the full record lifetime.
    pub async fn put(&self, message: &Message) -> Result<(), HeraldError> {
        let value = serde_json::to_string(message)?;
        self.store
            .set(&keys::message(&message.id), &value, self.ttl)
            .await
    }

    pub async fn get(&self, id: &MessageId) -> Result<Option<Message>, HeraldError> {
        match self.store.get(&keys::message(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Overwrite an existing record, keeping whatever lifetime it has left.
    async fn update(&self, message: &Message) -> Result<(), HeraldError> {
        let key = keys::message(&message.id);
        let ttl = self.store.ttl(&key).await?.unwrap_or(self.ttl);
        let value = serde_json::to_string(message)?;
        self.store.set(&key, &value, ttl).await
    }

    /// Move a `Pending` record to `Delivered`.
    ///
    /// Returns the record as stored afterwards, or `None` if it has expired.
    /// A record that is already past `Pending` is returned unchanged.
    pub async fn mark_delivered(
        &self,
        id: &MessageId,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, HeraldError> {
        let Some(mut message) = self.get(id).await? else {
            return Ok(None);
        };
        if message.mark_delivered(at) {
            self.update(&message).await?;
            debug!(message_id = %id, "record marked delivered");
        }
        Ok(Some(message))
    }

    /// Move a `Pending` record to `Failed`. Missing records are ignored.
    pub async fn mark_failed(&self, id: &MessageId) -> Result<(), HeraldError> {
        if let Some(mut message) = self.get(id).await? {
            if message.mark_failed() {
                self.update(&message).await?;
            }
        }
        Ok(())
    }

    /// Mark a delivered message as read on behalf of `reader_id`.
    pub async fn mark_read(
        &self,
        id: &MessageId,
        reader_id: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkReadOutcome, HeraldError> {
        let Some(mut message) = self.get(id).await? else {
            return Ok(MarkReadOutcome::NotFound);
        };
        if message.recipient_id != reader_id {
            return Ok(MarkReadOutcome::Forbidden);
        }
        match message.status {
            MessageStatus::Read => Ok(MarkReadOutcome::AlreadyRead),
            MessageStatus::Pending | MessageStatus::Failed => Ok(MarkReadOutcome::NotDelivered {
                status: message.status,
            }),
            MessageStatus::Delivered => {
                if !message.mark_read(at) {
                    return Err(HeraldError::Internal(format!(
                        "message {id} refused delivered -> read"
                    )));
                }
                self.update(&message).await?;
                let read_at = message.read_at.unwrap_or(at);
                debug!(message_id = %id, "record marked read");
                Ok(MarkReadOutcome::Marked { read_at })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::MessageDraft;
    use herald_storage::MemoryStore;

    fn records() -> (MessageRecords, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            MessageRecords::new(store.clone(), Duration::from_secs(86_400)),
            store,
        )
    }

    fn pending(recipient: &str) -> Message {
        Message::new(recipient, &MessageDraft::new("t", "b"), Utc::now())
    }

    #[tokio::test]
    async fn put_and_get() {
        let (records, store) = records();
        let msg = pending("u1");
        records.put(&msg).await.unwrap();
        assert_eq!(records.get(&msg.id).await.unwrap(), Some(msg.clone()));
        assert!(store.ttl(&keys::message(&msg.id)).await.unwrap().is_some());
        assert!(records.get(&MessageId("nope".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_on_pending_is_a_no_op() {
        let (records, _) = records();
        let msg = pending("u1");
        records.put(&msg).await.unwrap();

        let outcome = records.mark_read(&msg.id, "u1", Utc::now()).await.unwrap();
        assert_eq!(
            outcome,
            MarkReadOutcome::NotDelivered {
                status: MessageStatus::Pending
            }
        );
        let stored = records.get(&msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert!(stored.read_at.is_none());
    }

    #[tokio::test]
    async fn delivered_then_read_then_already_read() {
        let (records, _) = records();
        let msg = pending("u1");
        records.put(&msg).await.unwrap();

        let delivered = records.mark_delivered(&msg.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(delivered.status, MessageStatus::Delivered);

        let outcome = records.mark_read(&msg.id, "u1", Utc::now()).await.unwrap();
        assert!(matches!(outcome, MarkReadOutcome::Marked { .. }));
        let stored = records.get(&msg.id).await.unwrap().unwrap();
        assert!(stored.read_at.is_some() && stored.delivered_at.is_some());

        assert_eq!(
            records.mark_read(&msg.id, "u1", Utc::now()).await.unwrap(),
            MarkReadOutcome::AlreadyRead
        );
        // Read never moves back to delivered.
        let again = records.mark_delivered(&msg.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(again.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn other_reader_is_forbidden_and_missing_is_not_found() {
        let (records, _) = records();
        let mut msg = pending("u1");
        msg.mark_delivered(Utc::now());
        records.put(&msg).await.unwrap();

        assert_eq!(
            records.mark_read(&msg.id, "intruder", Utc::now()).await.unwrap(),
            MarkReadOutcome::Forbidden
        );
        assert_eq!(
            records
                .mark_read(&MessageId("gone".into()), "u1", Utc::now())
                .await
                .unwrap(),
            MarkReadOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn failed_is_terminal() {
        let (records, _) = records();
        let msg = pending("u1");
        records.put(&msg).await.unwrap();
        records.mark_failed(&msg.id).await.unwrap();
        let stored = records.mark_delivered(&msg.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(
            records.mark_read(&msg.id, "u1", Utc::now()).await.unwrap(),
            MarkReadOutcome::NotDelivered {
                status: MessageStatus::Failed
            }
        );
    }

    #[tokio::test]
    async fn updates_keep_remaining_lifetime() {
        let store = Arc::new(MemoryStore::new());
        let records = MessageRecords::new(store.clone(), Duration::from_secs(86_400));
        let msg = pending("u1");
        let key = keys::message(&msg.id);
        store
            .set(&key, &serde_json::to_string(&msg).unwrap(), Duration::from_secs(30))
            .await
            .unwrap();
        records.mark_delivered(&msg.id, Utc::now()).await.unwrap();
        assert!(store.ttl(&key).await.unwrap().unwrap() <= Duration::from_secs(30));
    }
}
