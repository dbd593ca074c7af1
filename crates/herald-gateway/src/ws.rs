// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket live channel.
//!
//! `GET /ws?token=<jwt>`. The token is verified before the upgrade; the
//! server then assigns the connection a fresh channel handle, registers it
//! with the transport and hands it to the engine, which starts catch-up.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "mark_read", "messageId": "..."}
//! {"type": "ping"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "notification", "data": {...message, "catchUp": false}}
//! {"type": "catchup_complete", "data": {"count": 3}}
//! {"type": "read_receipt", "data": {"messageId": "...", "readAt": "..."}}
//! {"type": "pong", "data": {}}
//! {"type": "error", "data": {"error": "..."}}
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use herald_core::{
    ChannelHandle, ChannelTransport, MarkReadOutcome, MessageId, VerifiedIdentity,
};

use crate::auth::authenticate;
use crate::handlers::ErrorResponse;
use crate::server::GatewayState;

/// Server -> client event names owned by the gateway.
pub mod message_types {
    /// Reply to a client `ping`.
    pub const PONG: &str = "pong";
    /// A client frame could not be handled.
    pub const ERROR: &str = "error";
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Frames a client may send.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    MarkRead {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    Ping,
}

/// WebSocket upgrade handler.
///
/// Authentication runs first, so a bad token is a 401 whether or not the
/// request is a valid upgrade.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(token) = query.token else {
        return unauthorized("missing token");
    };
    let identity = match authenticate(&state, &token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(error = %e, "websocket token rejected");
            return unauthorized("invalid token");
        }
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, identity)),
        Err(rejection) => rejection.into_response(),
    }
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(ErrorResponse {
            error: reason.to_string(),
        }),
    )
        .into_response()
}

/// Drive one connection until the client goes away.
async fn handle_socket(socket: WebSocket, state: GatewayState, identity: VerifiedIdentity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let handle = ChannelHandle(uuid::Uuid::new_v4().to_string());
    let user_id = identity.user_id;

    let mut rx = state.transport.register(&handle);
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!(user_id = %user_id, channel = %handle, "channel established");
    if let Err(e) = state.service.on_channel_established(&user_id, &handle).await {
        // The socket stays usable; messages are queued until the next connect.
        tracing::warn!(user_id = %user_id, error = %e, "presence registration failed");
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                handle_frame(&state, &user_id, &handle, text_str).await;
            }
            Message::Close(_) => break,
            _ => {} // Binary ignored; ping/pong handled by tungstenite.
        }
    }

    state.transport.unregister(&handle);
    if let Err(e) = state.service.on_channel_torn_down(&user_id, &handle).await {
        tracing::warn!(user_id = %user_id, error = %e, "presence cleanup failed");
    }
    sender_task.abort();
    tracing::info!(user_id = %user_id, channel = %handle, "channel closed");
}

async fn handle_frame(state: &GatewayState, user_id: &str, handle: &ChannelHandle, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("invalid WebSocket frame: {e}");
            reply_error(state, handle, json!({ "error": format!("invalid frame: {e}") })).await;
            return;
        }
    };

    match frame {
        ClientFrame::Ping => {
            if let Err(e) = state
                .transport
                .send(handle, message_types::PONG, json!({}))
                .await
            {
                tracing::debug!(error = %e, "pong not sent");
            }
        }
        ClientFrame::MarkRead { message_id } => {
            let id = MessageId(message_id);
            match state.service.mark_read(&id, user_id).await {
                // The engine already pushed a read_receipt.
                Ok(MarkReadOutcome::Marked { .. }) => {}
                Ok(outcome) => {
                    let mut data = serde_json::to_value(&outcome).unwrap_or_default();
                    if let serde_json::Value::Object(map) = &mut data {
                        map.insert("messageId".into(), json!(id));
                    }
                    reply_error(state, handle, data).await;
                }
                Err(e) => {
                    reply_error(
                        state,
                        handle,
                        json!({ "messageId": id, "error": e.to_string() }),
                    )
                    .await;
                }
            }
        }
    }
}

async fn reply_error(state: &GatewayState, handle: &ChannelHandle, data: serde_json::Value) {
    if let Err(e) = state
        .transport
        .send(handle, message_types::ERROR, data)
        .await
    {
        tracing::debug!(error = %e, "error frame not sent");
    }
}
