// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the REST surface, driven through the router with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use herald_config::HeraldConfig;
use herald_core::{ChannelHandle, IdentityVerifier};
use herald_engine::NotificationService;
use herald_gateway::{Claims, GatewayState, JwtVerifier, WsTransport, build_router};
use herald_storage::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    service: Arc<NotificationService>,
    transport: WsTransport,
    verifier: Arc<JwtVerifier>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_secret(Some(SECRET))
    }

    fn with_secret(secret: Option<&str>) -> Self {
        let mut config = HeraldConfig::default();
        config.catchup.pacing_ms = 1;
        let transport = WsTransport::new();
        let service = Arc::new(NotificationService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(transport.clone()),
            &config,
        ));
        let verifier = Arc::new(JwtVerifier::new(SECRET, 30));
        let configured = secret.map(|s| {
            Arc::new(JwtVerifier::new(s, 30)) as Arc<dyn IdentityVerifier>
        });
        let state = GatewayState::new(service.clone(), transport.clone(), configured);
        Self {
            router: build_router(state),
            service,
            transport,
            verifier,
        }
    }

    fn token(&self, sub: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.verifier
            .issue(&Claims {
                sub: sub.into(),
                email: None,
                iat: Some(now),
                exp: now + 3600,
                nbf: None,
            })
            .unwrap()
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Open a live channel for `user` and wait for its catch-up pass.
    async fn connect(&self, user: &str) -> (ChannelHandle, tokio::sync::mpsc::Receiver<String>) {
        let handle = ChannelHandle(format!("chan-{user}"));
        let rx = self.transport.register(&handle);
        self.service
            .on_channel_established(user, &handle)
            .await
            .unwrap()
            .await
            .unwrap();
        (handle, rx)
    }
}

fn frames(rx: &mut tokio::sync::mpsc::Receiver<String>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        out.push(serde_json::from_str(&raw).unwrap());
    }
    out
}

fn send_body(recipient: &str, title: &str) -> Value {
    json!({ "recipientId": recipient, "title": title, "body": "hello" })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call("GET", "/notifications/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "ok");
    assert_eq!(body["connections"], 0);
    assert!(body["stats"]["queued"].is_number());
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let app = TestApp::new();
    let (status, _) = app
        .call("POST", "/notifications/send", None, Some(send_body("u1", "t")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/notifications/pending")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_secret_fails_closed() {
    let app = TestApp::with_secret(None);
    let (status, _) = app
        .call("GET", "/notifications/pending", Some("u1"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/notifications/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn offline_send_queues_and_shows_as_pending() {
    let app = TestApp::new();
    let (status, body) = app
        .call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", "first")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "queued");
    assert_eq!(body["recipientId"], "bob");
    let id = body["messageId"].as_str().unwrap().to_string();

    let (status, pending) = app
        .call("GET", "/notifications/pending", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["count"], 1);
    assert_eq!(pending["messages"][0]["id"], id.as_str());
    assert_eq!(pending["messages"][0]["senderId"], "alice");

    let (status, mine) = app
        .call("GET", "/notifications/pending", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["count"], 0);
}

#[tokio::test]
async fn invalid_content_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app
        .call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", "   ")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("validation"));

    let (status, _) = app
        .call(
            "POST",
            "/notifications/send-batch",
            Some("alice"),
            Some(json!({ "recipientIds": ["a", "a"], "title": "t", "body": "b" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_record_is_private_to_recipient() {
    let app = TestApp::new();
    let (_, body) = app
        .call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", "secret")))
        .await;
    let id = body["messageId"].as_str().unwrap();

    let (status, record) = app
        .call("GET", &format!("/notifications/{id}"), Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "pending");
    assert_eq!(record["title"], "secret");

    let (status, _) = app
        .call("GET", &format!("/notifications/{id}"), Some("mallory"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("GET", "/notifications/no-such-id", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mark_read_outcomes_map_to_status_codes() {
    let app = TestApp::new();
    let (_, body) = app
        .call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", "t")))
        .await;
    let id = body["messageId"].as_str().unwrap().to_string();
    let uri = format!("/notifications/{id}/read");

    let (status, outcome) = app.call("PATCH", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(outcome["outcome"], "not_delivered");

    let (status, _) = app.call("PATCH", &uri, Some("mallory"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("PATCH", "/notifications/unknown/read", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn online_recipient_gets_live_push_and_read_receipt() {
    let app = TestApp::new();
    let (_handle, mut rx) = app.connect("bob").await;
    frames(&mut rx);

    let (status, body) = app
        .call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", "live")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "delivered");
    let id = body["messageId"].as_str().unwrap().to_string();

    let pushed = frames(&mut rx);
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0]["type"], "notification");
    assert_eq!(pushed[0]["data"]["title"], "live");
    assert_eq!(pushed[0]["data"]["catchUp"], false);

    let uri = format!("/notifications/{id}/read");
    let (status, outcome) = app.call("PATCH", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "marked");

    let receipts = frames(&mut rx);
    assert!(receipts
        .iter()
        .any(|f| f["type"] == "read_receipt" && f["data"]["messageId"] == id.as_str()));

    let (status, outcome) = app.call("PATCH", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "already_read");
}

#[tokio::test]
async fn reconnect_replays_backlog_in_order() {
    let app = TestApp::new();
    for title in ["one", "two", "three"] {
        app.call("POST", "/notifications/send", Some("alice"), Some(send_body("bob", title)))
            .await;
    }

    let (_handle, mut rx) = app.connect("bob").await;
    let replayed: Vec<Value> = frames(&mut rx)
        .into_iter()
        .filter(|f| f["type"] == "notification")
        .collect();
    let titles: Vec<&str> = replayed
        .iter()
        .map(|f| f["data"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    assert!(replayed.iter().all(|f| f["data"]["catchUp"] == true));

    let (_, pending) = app
        .call("GET", "/notifications/pending", Some("bob"), None)
        .await;
    assert_eq!(pending["count"], 0);
}

#[tokio::test]
async fn batch_reports_every_recipient() {
    let app = TestApp::new();
    let (_handle, _rx) = app.connect("online").await;

    let (status, report) = app
        .call(
            "POST",
            "/notifications/send-batch",
            Some("alice"),
            Some(json!({
                "recipientIds": ["online", "off1", "off2"],
                "title": "all hands",
                "body": "meeting at noon",
                "category": "alert"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 3);
    assert_eq!(report["delivered"].as_array().unwrap().len(), 1);
    assert_eq!(report["queued"].as_array().unwrap().len(), 2);
    assert_eq!(report["failed"].as_array().unwrap().len(), 0);
    assert_eq!(report["delivered"][0]["recipientId"], "online");
}

#[tokio::test]
async fn history_validates_limit() {
    let app = TestApp::new();
    let (status, body) = app
        .call("GET", "/notifications/history", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["messages"], json!([]));

    let (status, _) = app
        .call("GET", "/notifications/history?limit=101", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call("GET", "/notifications/history?limit=5&offset=10", Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offset"], 10);
}

#[tokio::test]
async fn websocket_requires_valid_token() {
    let app = TestApp::new();
    let (status, _) = app.call("GET", "/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/ws?token=garbage", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A valid token on a plain GET gets past auth and fails the upgrade instead.
    let uri = format!("/ws?token={}", app.token("bob"));
    let (status, _) = app.call("GET", &uri, None, None).await;
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert!(status.is_client_error());
}
