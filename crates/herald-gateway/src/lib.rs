// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket binding for the Herald notification engine.
//!
//! Serves the REST surface under `/notifications`, the live channel at
//! `/ws`, and implements [`ChannelTransport`] over the open WebSocket
//! connections so the engine can push events to them.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use herald_core::{
    AdapterType, ChannelHandle, ChannelTransport, HealthStatus, HeraldError, PluginAdapter,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub use auth::{Claims, JwtVerifier, auth_middleware};
pub use server::{GatewayState, HealthState, build_router, start_server};

/// Outbound frames buffered per connection before sends start failing.
pub const SEND_BUFFER: usize = 64;

/// Live-channel transport backed by the gateway's WebSocket connections.
///
/// Each open socket owns one bounded queue; `send` serialises the event
/// into a `{"type", "data"}` frame and enqueues it without waiting.
#[derive(Clone, Default)]
pub struct WsTransport {
    senders: Arc<DashMap<ChannelHandle, mpsc::Sender<String>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a queue for `handle` and return its receiving end.
    pub fn register(&self, handle: &ChannelHandle) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(SEND_BUFFER);
        self.senders.insert(handle.clone(), tx);
        rx
    }

    pub fn unregister(&self, handle: &ChannelHandle) {
        self.senders.remove(handle);
    }

    /// Number of open channels.
    pub fn connections(&self) -> usize {
        self.senders.len()
    }
}

/// Encode one server-to-client frame.
pub fn frame(event: &str, payload: serde_json::Value) -> String {
    serde_json::json!({ "type": event, "data": payload }).to_string()
}

#[async_trait]
impl PluginAdapter for WsTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn send(
        &self,
        handle: &ChannelHandle,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HeraldError> {
        let tx = self
            .senders
            .get(handle)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HeraldError::Transport {
                message: format!("no open channel {handle}"),
                source: None,
            })?;

        tx.try_send(frame(event, payload)).map_err(|e| {
            let message = match e {
                TrySendError::Full(_) => format!("send buffer full for channel {handle}"),
                TrySendError::Closed(_) => format!("channel {handle} closed"),
            };
            HeraldError::Transport {
                message,
                source: None,
            }
        })
    }

    fn is_open(&self, handle: &ChannelHandle) -> bool {
        self.senders
            .get(handle)
            .is_some_and(|entry| !entry.value().is_closed())
    }
}
