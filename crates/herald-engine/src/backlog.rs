// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient FIFO backlog of messages that could not be handed to a live
//! channel.
//!
//! Entries are full message snapshots appended to the list at
//! `backlog:<userId>`. The whole key expires; there is no per-entry removal.
//! The catch-up protocol is the only consumer and clears the key after a
//! fully successful pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_core::{DurableStore, HeraldError, Message};
use tracing::{debug, warn};

use crate::keys;

pub struct BacklogQueue {
    store: Arc<dyn DurableStore>,
    default_retention: Duration,
}

impl BacklogQueue {
    pub fn new(store: Arc<dyn DurableStore>, default_retention: Duration) -> Self {
        Self {
            store,
            default_retention,
        }
    }

    /// Retention window the queue key gets when `message` is appended.
    fn window_for(&self, message: &Message) -> Duration {
        match message.expires_at {
            Some(at) => (at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(Duration::from_millis(1)),
            None => self.default_retention,
        }
    }

    /// Append `message` to the tail of the recipient's queue.
    ///
    /// The key's expiry is reset to this message's window, even if that
    /// shortens it. Only a failed append is an error: once the entry is in
    /// the list it is queued, and a failed expiry update just keeps the
    /// previous window.
    pub async fn enqueue(&self, recipient_id: &str, message: &Message) -> Result<usize, HeraldError> {
        let key = keys::backlog(recipient_id);
        let value = serde_json::to_string(message)?;
        let len = self.store.push_back(&key, &value).await?;
        if let Err(e) = self.store.expire(&key, self.window_for(message)).await {
            warn!(recipient_id, message_id = %message.id, error = %e, "backlog expiry not updated");
        }
        debug!(recipient_id, message_id = %message.id, len, "message queued");
        Ok(len)
    }

    /// All queued messages in append order, without removing them.
    ///
    /// Entries that no longer decode are skipped.
    pub async fn drain(&self, recipient_id: &str) -> Result<Vec<Message>, HeraldError> {
        let raw = self.store.range(&keys::backlog(recipient_id)).await?;
        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<Message>(&entry) {
                Ok(message) => messages.push(message),
                Err(e) => warn!(recipient_id, error = %e, "skipping undecodable backlog entry"),
            }
        }
        Ok(messages)
    }

    /// Delete the recipient's whole queue.
    pub async fn clear(&self, recipient_id: &str) -> Result<(), HeraldError> {
        self.store.delete(&keys::backlog(recipient_id)).await?;
        debug!(recipient_id, "backlog cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::MessageDraft;
    use herald_storage::MemoryStore;
    use herald_test_utils::{FaultyStore, StoreOp};

    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    fn msg(recipient: &str, title: &str) -> Message {
        Message::new(recipient, &MessageDraft::new(title, "body"), Utc::now())
    }

    #[tokio::test]
    async fn drain_preserves_fifo_and_is_non_destructive() {
        let queue = BacklogQueue::new(Arc::new(MemoryStore::new()), WEEK);
        let m1 = msg("u1", "one");
        let m2 = msg("u1", "two");
        let m3 = msg("u1", "three");
        for m in [&m1, &m2, &m3] {
            queue.enqueue("u1", m).await.unwrap();
        }
        queue.enqueue("u2", &msg("u2", "other")).await.unwrap();

        let drained = queue.drain("u1").await.unwrap();
        let ids: Vec<_> = drained.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![m1.id.clone(), m2.id.clone(), m3.id.clone()]);
        assert_eq!(queue.drain("u1").await.unwrap().len(), 3);

        queue.clear("u1").await.unwrap();
        assert!(queue.drain("u1").await.unwrap().is_empty());
        assert_eq!(queue.drain("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn drain_empty_is_ok() {
        let queue = BacklogQueue::new(Arc::new(MemoryStore::new()), WEEK);
        assert!(queue.drain("nobody").await.unwrap().is_empty());
        queue.clear("nobody").await.unwrap();
    }

    #[tokio::test]
    async fn expiry_follows_most_recent_message() {
        let store = Arc::new(MemoryStore::new());
        let queue = BacklogQueue::new(store.clone(), WEEK);

        queue.enqueue("u1", &msg("u1", "default")).await.unwrap();
        let ttl = store.ttl("backlog:u1").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(6 * 24 * 3600));

        let draft = MessageDraft::new("short", "b").with_expires_in(Duration::from_secs(60));
        let short = Message::new("u1", &draft, Utc::now());
        queue.enqueue("u1", &short).await.unwrap();
        let ttl = store.ttl("backlog:u1").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60));

        queue.enqueue("u1", &msg("u1", "long again")).await.unwrap();
        let ttl = store.ttl("backlog:u1").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(6 * 24 * 3600));
    }

    #[tokio::test]
    async fn enqueue_failure_propagates() {
        let store = Arc::new(FaultyStore::over_memory());
        store.fail(StoreOp::PushBack, Some("backlog:u2")).await;
        let queue = BacklogQueue::new(store, WEEK);
        assert!(queue.enqueue("u1", &msg("u1", "ok")).await.is_ok());
        let err = queue.enqueue("u2", &msg("u2", "lost")).await.unwrap_err();
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn expiry_failure_after_append_still_queues() {
        let store = Arc::new(FaultyStore::over_memory());
        store.fail(StoreOp::Expire, Some("backlog:u1")).await;
        let queue = BacklogQueue::new(store, WEEK);
        assert_eq!(queue.enqueue("u1", &msg("u1", "kept")).await.unwrap(), 1);
        let drained = queue.drain("u1").await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].title, "kept");
    }

    #[tokio::test]
    async fn undecodable_entries_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.push_back("backlog:u1", "not json").await.unwrap();
        let queue = BacklogQueue::new(store, WEEK);
        queue.enqueue("u1", &msg("u1", "good")).await.unwrap();
        let drained = queue.drain("u1").await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].title, "good");
    }
}
