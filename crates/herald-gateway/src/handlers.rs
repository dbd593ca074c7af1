// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the `/notifications` REST API.
//!
//! Every authenticated handler reads the caller from the
//! [`VerifiedIdentity`] that [`crate::auth::auth_middleware`] stored in the
//! request extensions.

use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use herald_core::{
    BatchReport, Category, HeraldError, MarkReadOutcome, Message, MessageDraft, MessageId,
    RouteOutcome, VerifiedIdentity,
};
use herald_engine::StatsSnapshot;

use crate::server::GatewayState;

/// Page size used when `limit` is omitted.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`HeraldError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub HeraldError);

impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &HeraldError) -> StatusCode {
    match err {
        HeraldError::Validation(_) => StatusCode::BAD_REQUEST,
        HeraldError::Auth(_) => StatusCode::UNAUTHORIZED,
        HeraldError::NotFound { .. } => StatusCode::NOT_FOUND,
        HeraldError::Storage { .. } | HeraldError::StoreUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        HeraldError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Message content shared by single and batch sends.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Seconds until the message expires.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Content {
    fn into_draft(self, sender: &VerifiedIdentity) -> MessageDraft {
        let mut draft = MessageDraft::new(self.title, self.body)
            .with_category(self.category)
            .with_sender(sender.user_id.clone());
        if let Some(payload) = self.payload {
            draft = draft.with_payload(payload);
        }
        if let Some(secs) = self.expires_in {
            draft = draft.with_expires_in(Duration::from_secs(secs));
        }
        draft
    }
}

/// Request body for POST /notifications/send.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub recipient_id: String,
    #[serde(flatten)]
    pub content: Content,
}

/// Request body for POST /notifications/send-batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBatchRequest {
    pub recipient_ids: Vec<String>,
    #[serde(flatten)]
    pub content: Content,
}

/// Response body for POST /notifications/send.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub message_id: MessageId,
    pub recipient_id: String,
    #[serde(flatten)]
    pub outcome: RouteOutcome,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub count: usize,
}

impl From<Vec<Message>> for MessageList {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            count: messages.len(),
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub limit: usize,
    pub offset: usize,
}

/// Response body for GET /notifications/health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
    pub connections: usize,
    pub stats: StatsSnapshot,
}

/// GET /notifications/health
///
/// Public. 200 when the store answers a ping, 503 otherwise.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (status, code, store) = match state.service.ping_store().await {
        Ok(()) => ("ok", StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        store,
        connections: state.transport.connections(),
        stats: state.service.stats(),
    };
    (code, Json(body)).into_response()
}

/// POST /notifications/send
///
/// A `failed` outcome answers 503 so the caller knows to retry.
pub async fn post_send(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
    Json(request): Json<SendRequest>,
) -> Result<Response, ApiError> {
    let draft = request.content.into_draft(&caller);
    let routed = state.service.send_one(&request.recipient_id, &draft).await?;
    let code = match routed.outcome {
        RouteOutcome::Failed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    let body = SendResponse {
        message_id: routed.message_id,
        recipient_id: request.recipient_id,
        outcome: routed.outcome,
    };
    Ok((code, Json(body)).into_response())
}

/// POST /notifications/send-batch
///
/// Always 200 once validation passes; the report's buckets are authoritative.
pub async fn post_send_batch(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
    Json(request): Json<SendBatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let draft = request.content.into_draft(&caller);
    let report = state
        .service
        .send_batch(&request.recipient_ids, &draft)
        .await?;
    Ok(Json(report))
}

/// GET /notifications/pending
pub async fn get_pending(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
) -> Result<Json<MessageList>, ApiError> {
    let pending = state.service.get_pending(&caller.user_id).await?;
    Ok(Json(pending.into()))
}

/// GET /notifications/history?limit=&offset=
pub async fn get_history(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let messages = state
        .service
        .get_history(&caller.user_id, limit, offset)
        .await?;
    Ok(Json(HistoryResponse {
        messages,
        limit,
        offset,
    }))
}

/// GET /notifications/{id}
pub async fn get_message(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .service
        .get_message(&MessageId(id), &caller.user_id)
        .await?;
    Ok(Json(message))
}

pub fn status_for_read(outcome: &MarkReadOutcome) -> StatusCode {
    match outcome {
        MarkReadOutcome::Marked { .. } | MarkReadOutcome::AlreadyRead => StatusCode::OK,
        MarkReadOutcome::NotDelivered { .. } => StatusCode::CONFLICT,
        MarkReadOutcome::NotFound => StatusCode::NOT_FOUND,
        MarkReadOutcome::Forbidden => StatusCode::FORBIDDEN,
    }
}

/// PATCH /notifications/{id}/read
pub async fn patch_read(
    State(state): State<GatewayState>,
    Extension(caller): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = state
        .service
        .mark_read(&MessageId(id), &caller.user_id)
        .await?;
    Ok((status_for_read(&outcome), Json(outcome)).into_response())
}
