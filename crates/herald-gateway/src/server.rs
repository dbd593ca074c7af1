// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use herald_config::model::{AuthConfig, ServerConfig};
use herald_core::{HeraldError, IdentityVerifier};
use herald_engine::NotificationService;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::WsTransport;
use crate::auth::{JwtVerifier, auth_middleware};
use crate::handlers;
use crate::ws;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<NotificationService>,
    /// Open WebSocket connections; the same instance the service sends through.
    pub transport: WsTransport,
    /// `None` rejects every authenticated request.
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(
        service: Arc<NotificationService>,
        transport: WsTransport,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self {
        Self {
            service,
            transport,
            verifier,
            health: HealthState::default(),
        }
    }
}

/// Build the token verifier for `auth`, if a secret is configured.
pub fn verifier_from_config(auth: &AuthConfig) -> Option<Arc<dyn IdentityVerifier>> {
    auth.jwt_secret.as_ref().map(|secret| {
        Arc::new(JwtVerifier::new(secret.as_bytes(), auth.leeway_secs)) as Arc<dyn IdentityVerifier>
    })
}

/// All gateway routes:
/// - GET /notifications/health (public)
/// - /notifications/* REST endpoints (bearer token)
/// - GET /ws (token in the query string, checked before upgrade)
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/notifications/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/notifications/send", post(handlers::post_send))
        .route("/notifications/send-batch", post(handlers::post_send_batch))
        .route("/notifications/pending", get(handlers::get_pending))
        .route("/notifications/history", get(handlers::get_history))
        .route("/notifications/{id}", get(handlers::get_message))
        .route("/notifications/{id}/read", patch(handlers::patch_read))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Bind `host:port` and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), HeraldError> {
    if state.verifier.is_none() {
        tracing::warn!("auth.jwt_secret is not set; authenticated routes will reject every request");
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HeraldError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| HeraldError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
