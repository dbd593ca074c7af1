// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local delivery counters, reported by the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use herald_core::RouteOutcome;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct EngineStats {
    delivered: AtomicU64,
    queued: AtomicU64,
    failed: AtomicU64,
    catchup_passes: AtomicU64,
    catchup_delivered: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub queued: u64,
    pub failed: u64,
    pub catchup_passes: u64,
    pub catchup_delivered: u64,
}

impl EngineStats {
    pub fn record_route(&self, outcome: &RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Delivered => &self.delivered,
            RouteOutcome::Queued => &self.queued,
            RouteOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_catchup(&self, delivered: usize) {
        self.catchup_passes.fetch_add(1, Ordering::Relaxed);
        self.catchup_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            catchup_passes: self.catchup_passes.load(Ordering::Relaxed),
            catchup_delivered: self.catchup_delivered.load(Ordering::Relaxed),
        }
    }
}
