// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-channel transport trait (WebSocket gateway, test mocks).

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChannelHandle;

/// Dispatches events to open client channels addressed by handle.
///
/// The engine never keeps its own table of connections; it resolves handles
/// through presence and hands them to the transport on demand.
#[async_trait]
pub trait ChannelTransport: PluginAdapter {
    /// Sends one event to the channel. Success means the transport accepted
    /// the event, not that the client received it.
    async fn send(
        &self,
        handle: &ChannelHandle,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HeraldError>;

    /// Whether the transport still holds an open channel for `handle`.
    fn is_open(&self, handle: &ChannelHandle) -> bool;
}
