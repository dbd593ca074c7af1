// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery router: per recipient, hand a new message to the live channel or
//! append it to the backlog.
//!
//! Routing never returns an error. Whatever goes wrong for one recipient
//! becomes that recipient's [`RouteOutcome::Failed`], and the rest of a
//! batch carries on.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use herald_core::{
    BatchReport, ChannelHandle, ChannelTransport, HeraldError, Message, MessageDraft, MessageId,
    RouteOutcome,
};
use tracing::{debug, info, warn};

use crate::backlog::BacklogQueue;
use crate::events;
use crate::presence::PresenceTracker;
use crate::records::MessageRecords;
use crate::stats::EngineStats;

/// Outcome of routing to one recipient, with the id the message got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub message_id: MessageId,
    pub outcome: RouteOutcome,
}

pub struct DeliveryRouter {
    presence: Arc<PresenceTracker>,
    backlog: Arc<BacklogQueue>,
    records: Arc<MessageRecords>,
    transport: Arc<dyn ChannelTransport>,
    stats: Arc<EngineStats>,
    concurrency: usize,
}

impl DeliveryRouter {
    pub fn new(
        presence: Arc<PresenceTracker>,
        backlog: Arc<BacklogQueue>,
        records: Arc<MessageRecords>,
        transport: Arc<dyn ChannelTransport>,
        stats: Arc<EngineStats>,
        concurrency: usize,
    ) -> Self {
        Self {
            presence,
            backlog,
            records,
            transport,
            stats,
            concurrency: concurrency.max(1),
        }
    }

    /// Create a message for `recipient_id` and deliver or queue it.
    pub async fn route(&self, recipient_id: &str, draft: &MessageDraft) -> Routed {
        let message = Message::new(recipient_id, draft, Utc::now());
        let message_id = message.id.clone();
        let outcome = match self.presence.lookup(recipient_id).await {
            Some(handle) => self.hand_off(&handle, message).await,
            None => self.enqueue(message).await,
        };
        self.stats.record_route(&outcome);
        Routed {
            message_id,
            outcome,
        }
    }

    /// Route one message per recipient, up to `concurrency` at a time.
    ///
    /// The report is assembled from per-recipient results, so every
    /// recipient lands in exactly one bucket whatever the completion order.
    pub async fn route_batch(&self, recipient_ids: &[String], draft: &MessageDraft) -> BatchReport {
        let results: Vec<(String, Routed)> = stream::iter(recipient_ids.iter().cloned())
            .map(|recipient_id: String| async move {
                let routed = self.route(&recipient_id, draft).await;
                (recipient_id, routed)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport {
            total: recipient_ids.len(),
            ..Default::default()
        };
        for (recipient_id, routed) in results {
            report.record(recipient_id, routed.message_id, routed.outcome);
        }
        info!(
            total = report.total,
            delivered = report.delivered.len(),
            queued = report.queued.len(),
            failed = report.failed.len(),
            "batch routed"
        );
        report
    }

    async fn hand_off(&self, handle: &ChannelHandle, message: Message) -> RouteOutcome {
        let mut delivered = message.clone();
        delivered.mark_delivered(Utc::now());
        let payload = match events::notification(&delivered, false) {
            Ok(payload) => payload,
            Err(e) => return self.fail(message, e).await,
        };
        if let Err(e) = self
            .transport
            .send(handle, events::NOTIFICATION, payload)
            .await
        {
            return self.fail(message, e).await;
        }
        if let Err(e) = self.records.put(&delivered).await {
            warn!(message_id = %delivered.id, error = %e, "failed to store delivered record");
        }
        debug!(
            recipient_id = %delivered.recipient_id,
            message_id = %delivered.id,
            handle = %handle,
            "message handed to live channel"
        );
        RouteOutcome::Delivered
    }

    async fn enqueue(&self, message: Message) -> RouteOutcome {
        if let Err(e) = self.backlog.enqueue(&message.recipient_id, &message).await {
            return self.fail(message, e).await;
        }
        if let Err(e) = self.records.put(&message).await {
            warn!(message_id = %message.id, error = %e, "failed to store pending record");
        }
        RouteOutcome::Queued
    }

    async fn fail(&self, mut message: Message, error: HeraldError) -> RouteOutcome {
        warn!(
            recipient_id = %message.recipient_id,
            message_id = %message.id,
            error = %error,
            "routing failed"
        );
        message.mark_failed();
        if let Err(e) = self.records.put(&message).await {
            debug!(message_id = %message.id, error = %e, "failed record not stored");
        }
        RouteOutcome::Failed {
            reason: error.to_string(),
        }
    }
}
