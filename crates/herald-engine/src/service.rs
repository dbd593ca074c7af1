// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound command surface of the engine.
//!
//! [`NotificationService`] wires presence, backlog, records, router and
//! catch-up around one durable store and one transport. Any binding (HTTP,
//! WebSocket, tests) drives the engine through it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use herald_config::HeraldConfig;
use herald_core::{
    BatchReport, ChannelHandle, ChannelTransport, DurableStore, HeraldError, MarkReadOutcome,
    Message, MessageDraft, MessageId, PluginAdapter,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::backlog::BacklogQueue;
use crate::catchup::{CatchUp, CatchUpReport};
use crate::events;
use crate::presence::PresenceTracker;
use crate::records::MessageRecords;
use crate::router::{DeliveryRouter, Routed};
use crate::stats::{EngineStats, StatsSnapshot};
use crate::validation;

/// Largest page `get_history` accepts.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// An open channel whose catch-up pass can still be cancelled.
struct Session {
    user_id: String,
    token: CancellationToken,
}

pub struct NotificationService {
    store: Arc<dyn DurableStore>,
    transport: Arc<dyn ChannelTransport>,
    presence: Arc<PresenceTracker>,
    backlog: Arc<BacklogQueue>,
    records: Arc<MessageRecords>,
    router: DeliveryRouter,
    catchup: Arc<CatchUp>,
    stats: Arc<EngineStats>,
    sessions: DashMap<ChannelHandle, Session>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
    max_batch_size: usize,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        transport: Arc<dyn ChannelTransport>,
        config: &HeraldConfig,
    ) -> Self {
        let presence = Arc::new(PresenceTracker::new(
            store.clone(),
            config.presence.ttl(),
            config.presence.lookup_timeout(),
        ));
        let backlog = Arc::new(BacklogQueue::new(store.clone(), config.backlog.retention()));
        let records = Arc::new(MessageRecords::new(
            store.clone(),
            config.messages.record_ttl(),
        ));
        let stats = Arc::new(EngineStats::default());
        let router = DeliveryRouter::new(
            presence.clone(),
            backlog.clone(),
            records.clone(),
            transport.clone(),
            stats.clone(),
            config.delivery.concurrency,
        );
        let catchup = Arc::new(CatchUp::new(
            backlog.clone(),
            records.clone(),
            transport.clone(),
            config.catchup.pacing(),
        ));
        info!(
            store = store.name(),
            transport = transport.name(),
            "notification service initialized"
        );
        Self {
            store,
            transport,
            presence,
            backlog,
            records,
            router,
            catchup,
            stats,
            sessions: DashMap::new(),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            max_batch_size: config.delivery.max_batch_size,
        }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn backlog(&self) -> &BacklogQueue {
        &self.backlog
    }

    pub fn records(&self) -> &MessageRecords {
        &self.records
    }

    /// Validate and route one message.
    pub async fn send_one(
        &self,
        recipient_id: &str,
        draft: &MessageDraft,
    ) -> Result<Routed, HeraldError> {
        validation::validate_recipient(recipient_id)?;
        validation::validate_draft(draft)?;
        Ok(self.router.route(recipient_id, draft).await)
    }

    /// Validate and route one independent message per recipient.
    pub async fn send_batch(
        &self,
        recipient_ids: &[String],
        draft: &MessageDraft,
    ) -> Result<BatchReport, HeraldError> {
        validation::validate_recipients(recipient_ids, self.max_batch_size)?;
        validation::validate_draft(draft)?;
        Ok(self.router.route_batch(recipient_ids, draft).await)
    }

    /// Messages still waiting in the user's backlog, oldest first.
    pub async fn get_pending(&self, user_id: &str) -> Result<Vec<Message>, HeraldError> {
        let now = Utc::now();
        let mut pending = self.backlog.drain(user_id).await?;
        pending.retain(|m| !m.is_expired(now));
        Ok(pending)
    }

    /// Delivered-message history. Nothing is retained beyond the record
    /// lifetime, so this is always empty.
    pub async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, HeraldError> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(HeraldError::Validation(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}"
            )));
        }
        debug!(user_id, limit, offset, "history requested");
        Ok(Vec::new())
    }

    /// The record of a message addressed to `requester_id`.
    ///
    /// Someone else's message reads as not found.
    pub async fn get_message(
        &self,
        id: &MessageId,
        requester_id: &str,
    ) -> Result<Message, HeraldError> {
        match self.records.get(id).await? {
            Some(message) if message.recipient_id == requester_id => Ok(message),
            _ => Err(HeraldError::NotFound {
                kind: "message",
                id: id.to_string(),
            }),
        }
    }

    /// Mark a delivered message read and tell the reader's channel.
    pub async fn mark_read(
        &self,
        id: &MessageId,
        reader_id: &str,
    ) -> Result<MarkReadOutcome, HeraldError> {
        let outcome = self.records.mark_read(id, reader_id, Utc::now()).await?;
        if let MarkReadOutcome::Marked { read_at } = &outcome {
            if let Some(handle) = self.presence.lookup(reader_id).await {
                let receipt = events::read_receipt(id, *read_at);
                if let Err(e) = self
                    .transport
                    .send(&handle, events::READ_RECEIPT, receipt)
                    .await
                {
                    debug!(message_id = %id, error = %e, "read receipt not sent");
                }
            }
        }
        Ok(outcome)
    }

    /// A channel came up for `user_id`: record presence, then replay the
    /// backlog in the background.
    ///
    /// Only the presence write can fail. The returned handle resolves to the
    /// catch-up report; dropping it does not stop the pass.
    pub async fn on_channel_established(
        &self,
        user_id: &str,
        handle: &ChannelHandle,
    ) -> Result<JoinHandle<CatchUpReport>, HeraldError> {
        self.presence.register(user_id, handle).await?;

        // One live channel per user: an older connection's replay stops here.
        for session in self.sessions.iter() {
            if session.user_id == user_id && session.key() != handle {
                session.token.cancel();
            }
        }

        let token = self.shutdown.child_token();
        self.sessions.insert(
            handle.clone(),
            Session {
                user_id: user_id.to_string(),
                token: token.clone(),
            },
        );

        let catchup = self.catchup.clone();
        let stats = self.stats.clone();
        let user_id = user_id.to_string();
        let handle = handle.clone();
        Ok(self.tasks.spawn(async move {
            let report = catchup.run(&user_id, &handle, &token).await;
            stats.record_catchup(report.delivered);
            report
        }))
    }

    /// A channel went away: stop its catch-up and drop presence if it still
    /// points at this channel.
    pub async fn on_channel_torn_down(
        &self,
        user_id: &str,
        handle: &ChannelHandle,
    ) -> Result<(), HeraldError> {
        if let Some((_, session)) = self.sessions.remove(handle) {
            session.token.cancel();
        }
        self.presence.unregister_handle(user_id, handle).await?;
        Ok(())
    }

    /// Store round-trip used by health checks.
    pub async fn ping_store(&self) -> Result<(), HeraldError> {
        self.store.ping().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of channels with a tracked session.
    ///
    /// A channel replaced by a newer one for the same user has its catch-up
    /// cancelled but is still counted until its own teardown arrives.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel every catch-up pass and wait for them to stop.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        self.sessions.clear();
        if let Err(e) = self.store.shutdown().await {
            warn!(error = %e, "store shutdown failed");
        }
        info!("notification service stopped");
    }
}
