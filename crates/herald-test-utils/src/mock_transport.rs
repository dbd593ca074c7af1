// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock live-channel transport for deterministic testing.
//!
//! Handles must be opened before they accept events. Sent events are
//! captured in order for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::Mutex;

use herald_core::{
    AdapterType, ChannelHandle, ChannelTransport, HealthStatus, HeraldError, PluginAdapter,
};

const UNLIMITED: usize = usize::MAX;

/// One event accepted by [`MockTransport::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub handle: ChannelHandle,
    pub event: String,
    pub payload: serde_json::Value,
}

pub struct MockTransport {
    open: DashSet<ChannelHandle>,
    failing: DashSet<ChannelHandle>,
    /// Sends still allowed to succeed; `UNLIMITED` disables the budget.
    budget: AtomicUsize,
    sent: Mutex<Vec<SentEvent>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            open: DashSet::new(),
            failing: DashSet::new(),
            budget: AtomicUsize::new(UNLIMITED),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Mark `handle` as an open channel.
    pub fn open(&self, handle: &ChannelHandle) {
        self.open.insert(handle.clone());
    }

    /// Close `handle`; later sends to it fail and `is_open` turns false.
    pub fn close(&self, handle: &ChannelHandle) {
        self.open.remove(handle);
    }

    /// Keep `handle` open but make every send to it fail.
    pub fn fail_handle(&self, handle: &ChannelHandle) {
        self.failing.insert(handle.clone());
    }

    /// Let `n` more sends succeed, then fail all later ones.
    pub fn fail_after(&self, n: usize) {
        self.budget.store(n, Ordering::SeqCst);
    }

    /// Everything sent so far, in send order.
    pub async fn sent(&self) -> Vec<SentEvent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, handle: &ChannelHandle) -> Vec<SentEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| &e.handle == handle)
            .cloned()
            .collect()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    fn take_budget(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChannelTransport for MockTransport {
    async fn send(
        &self,
        handle: &ChannelHandle,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HeraldError> {
        if !self.open.contains(handle) {
            return Err(HeraldError::Transport {
                message: format!("channel {handle} is closed"),
                source: None,
            });
        }
        if self.failing.contains(handle) || !self.take_budget() {
            return Err(HeraldError::Transport {
                message: format!("injected send failure on {handle}"),
                source: None,
            });
        }
        self.sent.lock().await.push(SentEvent {
            handle: handle.clone(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    fn is_open(&self, handle: &ChannelHandle) -> bool {
        self.open.contains(handle)
    }
}
