// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catch-up protocol: replay a recipient's backlog to a channel that has just
//! come up.
//!
//! A pass runs `Idle -> Draining -> Completing -> Idle`. The backlog is only
//! cleared once every entry has been handled; an interrupted pass leaves the
//! whole queue for the next connection, so messages may be seen twice but
//! not lost. A message appended between the drain and the clear of a
//! successful pass is deleted with the rest of the key.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_core::{ChannelHandle, ChannelTransport, MessageStatus};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backlog::BacklogQueue;
use crate::events;
use crate::records::MessageRecords;

/// How a catch-up pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpOutcome {
    /// Every entry was handled and the backlog cleared.
    Completed,
    /// Nothing was queued; no events were sent.
    Empty,
    /// The channel went away or a send failed; the backlog was kept.
    Interrupted,
    /// The backlog could not be read.
    DrainFailed,
    /// Every entry was handled but the backlog could not be deleted.
    ClearFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchUpReport {
    pub user_id: String,
    /// Messages handed to the channel during this pass.
    pub delivered: usize,
    /// Entries not sent because their record was already read.
    pub skipped: usize,
    /// Entries not sent because their own expiry had passed.
    pub expired: usize,
    pub outcome: CatchUpOutcome,
}

impl CatchUpReport {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            delivered: 0,
            skipped: 0,
            expired: 0,
            outcome: CatchUpOutcome::Empty,
        }
    }

    fn finish(mut self, outcome: CatchUpOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

pub struct CatchUp {
    backlog: Arc<BacklogQueue>,
    records: Arc<MessageRecords>,
    transport: Arc<dyn ChannelTransport>,
    pacing: Duration,
}

impl CatchUp {
    pub fn new(
        backlog: Arc<BacklogQueue>,
        records: Arc<MessageRecords>,
        transport: Arc<dyn ChannelTransport>,
        pacing: Duration,
    ) -> Self {
        Self {
            backlog,
            records,
            transport,
            pacing,
        }
    }

    fn is_live(&self, handle: &ChannelHandle, token: &CancellationToken) -> bool {
        !token.is_cancelled() && self.transport.is_open(handle)
    }

    /// Run one pass for `user_id` over `handle`.
    ///
    /// Never fails: store and transport errors end the pass with the
    /// matching [`CatchUpOutcome`] and are logged. Cancelling `token` stops
    /// the pass before the next send.
    pub async fn run(
        &self,
        user_id: &str,
        handle: &ChannelHandle,
        token: &CancellationToken,
    ) -> CatchUpReport {
        let report = CatchUpReport::new(user_id);

        let entries = match self.backlog.drain(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, error = %e, "catch-up drain failed, connection continues");
                return report.finish(CatchUpOutcome::DrainFailed);
            }
        };
        if entries.is_empty() {
            return report.finish(CatchUpOutcome::Empty);
        }
        debug!(user_id, queued = entries.len(), "catch-up draining");

        let mut report = report;
        for snapshot in entries {
            let now = Utc::now();
            if snapshot.is_expired(now) {
                report.expired += 1;
                continue;
            }

            let current = match self.records.get(&snapshot.id).await {
                Ok(current) => current,
                Err(e) => {
                    warn!(message_id = %snapshot.id, error = %e, "record lookup failed, replaying snapshot");
                    None
                }
            };
            if current.as_ref().is_some_and(|m| m.status == MessageStatus::Read) {
                report.skipped += 1;
                continue;
            }

            if report.delivered > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.pacing) => {}
                    _ = token.cancelled() => {}
                }
            }
            if !self.is_live(handle, token) {
                info!(user_id, delivered = report.delivered, "catch-up interrupted, backlog kept");
                return report.finish(CatchUpOutcome::Interrupted);
            }

            let mut replay = snapshot;
            replay.mark_delivered(Utc::now());
            let payload = match events::notification(&replay, true) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(message_id = %replay.id, error = %e, "cannot encode backlog entry");
                    return report.finish(CatchUpOutcome::Interrupted);
                }
            };
            if let Err(e) = self
                .transport
                .send(handle, events::NOTIFICATION, payload)
                .await
            {
                info!(user_id, error = %e, delivered = report.delivered, "catch-up send failed, backlog kept");
                return report.finish(CatchUpOutcome::Interrupted);
            }
            report.delivered += 1;

            if let Err(e) = self.records.mark_delivered(&replay.id, Utc::now()).await {
                warn!(message_id = %replay.id, error = %e, "failed to mark record delivered");
            }
        }

        if let Err(e) = self.backlog.clear(user_id).await {
            warn!(user_id, error = %e, "catch-up clear failed, entries will replay");
            return report.finish(CatchUpOutcome::ClearFailed);
        }
        if let Err(e) = self
            .transport
            .send(
                handle,
                events::CATCHUP_COMPLETE,
                events::catchup_complete(report.delivered),
            )
            .await
        {
            debug!(user_id, error = %e, "completion event not sent");
        }
        info!(
            user_id,
            delivered = report.delivered,
            skipped = report.skipped,
            expired = report.expired,
            "catch-up complete"
        );
        report.finish(CatchUpOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use herald_core::{DurableStore, Message, MessageDraft};
    use herald_storage::MemoryStore;
    use herald_test_utils::{FaultyStore, MockTransport, StoreOp};

    use super::*;

    struct Fixture {
        catchup: CatchUp,
        backlog: Arc<BacklogQueue>,
        records: Arc<MessageRecords>,
        transport: Arc<MockTransport>,
        handle: ChannelHandle,
    }

    fn fixture(store: Arc<dyn DurableStore>) -> Fixture {
        let backlog = Arc::new(BacklogQueue::new(store.clone(), Duration::from_secs(604_800)));
        let records = Arc::new(MessageRecords::new(store, Duration::from_secs(86_400)));
        let transport = Arc::new(MockTransport::new());
        let handle = ChannelHandle("h1".into());
        transport.open(&handle);
        let catchup = CatchUp::new(
            backlog.clone(),
            records.clone(),
            transport.clone(),
            Duration::from_millis(100),
        );
        Fixture {
            catchup,
            backlog,
            records,
            transport,
            handle,
        }
    }

    async fn queue(f: &Fixture, user: &str, title: &str) -> Message {
        let msg = Message::new(user, &MessageDraft::new(title, "body"), Utc::now());
        f.backlog.enqueue(user, &msg).await.unwrap();
        f.records.put(&msg).await.unwrap();
        msg
    }

    #[tokio::test(start_paused = true)]
    async fn replays_in_order_then_clears() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let m1 = queue(&f, "u4", "one").await;
        let m2 = queue(&f, "u4", "two").await;
        let m3 = queue(&f, "u4", "three").await;

        let started = tokio::time::Instant::now();
        let report = f.catchup.run("u4", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::Completed);
        assert_eq!(report.delivered, 3);
        // Pacing between sends, none before the first.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));

        let sent = f.transport.sent_to(&f.handle).await;
        let ids: Vec<_> = sent
            .iter()
            .filter(|e| e.event == events::NOTIFICATION)
            .map(|e| e.payload["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec![m1.id.0, m2.id.0, m3.id.0.clone()]);
        assert!(sent
            .iter()
            .filter(|e| e.event == events::NOTIFICATION)
            .all(|e| e.payload["catchUp"] == true));
        let last = sent.last().unwrap();
        assert_eq!(last.event, events::CATCHUP_COMPLETE);
        assert_eq!(last.payload["count"], 3);

        assert!(f.backlog.drain("u4").await.unwrap().is_empty());
        let record = f.records.get(&m3.id).await.unwrap().unwrap();
        assert_eq!(record.status, MessageStatus::Delivered);
    }

    #[tokio::test]
    async fn empty_backlog_sends_nothing() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::Empty);
        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_mid_pass_keeps_whole_backlog() {
        let f = fixture(Arc::new(MemoryStore::new()));
        for i in 0..5 {
            queue(&f, "u1", &format!("m{i}")).await;
        }
        f.transport.fail_after(2);

        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::Interrupted);
        assert_eq!(report.delivered, 2);
        assert_eq!(f.backlog.drain("u1").await.unwrap().len(), 5);
        assert!(f
            .transport
            .sent()
            .await
            .iter()
            .all(|e| e.event != events::CATCHUP_COMPLETE));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_pacing_immediately() {
        let f = Arc::new(fixture(Arc::new(MemoryStore::new())));
        for i in 0..3 {
            queue(&f, "u1", &format!("m{i}")).await;
        }
        let token = CancellationToken::new();
        let runner = {
            let f = f.clone();
            let token = token.clone();
            tokio::spawn(async move { f.catchup.run("u1", &f.handle, &token).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        let report = runner.await.unwrap();
        assert_eq!(report.outcome, CatchUpOutcome::Interrupted);
        assert_eq!(report.delivered, 1);
        assert_eq!(f.backlog.drain("u1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn closed_channel_is_not_written_to() {
        let f = fixture(Arc::new(MemoryStore::new()));
        queue(&f, "u1", "m").await;
        f.transport.close(&f.handle);
        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::Interrupted);
        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn read_and_expired_entries_are_not_replayed() {
        let f = fixture(Arc::new(MemoryStore::new()));
        let read = queue(&f, "u1", "already read").await;
        f.records.mark_delivered(&read.id, Utc::now()).await.unwrap();
        f.records.mark_read(&read.id, "u1", Utc::now()).await.unwrap();

        let mut stale = Message::new("u1", &MessageDraft::new("stale", "b"), Utc::now());
        stale.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        f.backlog.enqueue("u1", &stale).await.unwrap();

        let fresh = queue(&f, "u1", "fresh").await;

        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::Completed);
        assert_eq!((report.delivered, report.skipped, report.expired), (1, 1, 1));
        let sent = f.transport.sent().await;
        assert_eq!(sent[0].payload["id"], fresh.id.as_str());
    }

    #[tokio::test]
    async fn drain_failure_is_contained() {
        let store = Arc::new(FaultyStore::over_memory());
        let f = fixture(store.clone());
        queue(&f, "u1", "m").await;
        store.fail(StoreOp::Range, None).await;
        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::DrainFailed);
        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn clear_failure_keeps_entries_for_next_pass() {
        let store = Arc::new(FaultyStore::over_memory());
        let f = fixture(store.clone());
        queue(&f, "u1", "m").await;
        store.fail(StoreOp::Delete, Some("backlog:u1")).await;
        let report = f.catchup.run("u1", &f.handle, &CancellationToken::new()).await;
        assert_eq!(report.outcome, CatchUpOutcome::ClearFailed);
        assert_eq!(report.delivered, 1);
        assert_eq!(f.backlog.drain("u1").await.unwrap().len(), 1);
    }
}
