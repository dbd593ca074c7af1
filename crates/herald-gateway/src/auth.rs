// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HS256 bearer-token authentication.
//!
//! [`JwtVerifier`] implements [`IdentityVerifier`]; [`auth_middleware`]
//! applies it to the REST routes. With no secret configured every request
//! is rejected (fail-closed).

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;

use herald_core::{
    AdapterType, HealthStatus, HeraldError, IdentityVerifier, PluginAdapter, VerifiedIdentity,
};

use crate::server::GatewayState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Claims carried by a Herald token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

fn auth_err(reason: &str) -> HeraldError {
    HeraldError::Auth(reason.to_string())
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, HeraldError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| auth_err("token segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|_| auth_err("token segment is not valid JSON"))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, HeraldError> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}

/// Verifies (and, for local testing, issues) HS256 tokens.
pub struct JwtVerifier {
    secret: Vec<u8>,
    leeway_secs: i64,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, leeway_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            leeway_secs: i64::try_from(leeway_secs).unwrap_or(i64::MAX),
        }
    }

    fn mac(&self) -> Result<HmacSha256, HeraldError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| HeraldError::Internal(format!("invalid HMAC key: {e}")))
    }

    /// Sign `claims` into a compact token.
    pub fn issue(&self, claims: &Claims) -> Result<String, HeraldError> {
        let header = encode_segment(&Header {
            alg: "HS256".into(),
            typ: Some("JWT".into()),
        })?;
        let payload = encode_segment(claims)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{header}.{payload}.{signature}"))
    }

    /// Check signature and time claims against `now` (unix seconds).
    pub fn decode(&self, token: &str, now: i64) -> Result<Claims, HeraldError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(auth_err("malformed token"));
        };

        let parsed: Header = decode_segment(header)?;
        if parsed.alg != "HS256" {
            return Err(auth_err("unsupported token algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| auth_err("token signature is not base64url"))?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| auth_err("invalid token signature"))?;

        let claims: Claims = decode_segment(payload)?;
        if claims.sub.trim().is_empty() {
            return Err(auth_err("token has no subject"));
        }
        if now > claims.exp.saturating_add(self.leeway_secs) {
            return Err(auth_err("token expired"));
        }
        if let Some(nbf) = claims.nbf {
            if now.saturating_add(self.leeway_secs) < nbf {
                return Err(auth_err("token not yet valid"));
            }
        }
        Ok(claims)
    }
}

#[async_trait]
impl PluginAdapter for JwtVerifier {
    fn name(&self) -> &str {
        "jwt-hs256"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, HeraldError> {
        let claims = self.decode(credential, chrono::Utc::now().timestamp())?;
        Ok(VerifiedIdentity {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Verify a raw credential with the configured verifier.
pub(crate) async fn authenticate(
    state: &GatewayState,
    credential: &str,
) -> Result<VerifiedIdentity, HeraldError> {
    match &state.verifier {
        Some(verifier) => verifier.verify(credential).await,
        None => Err(auth_err("no token secret configured")),
    }
}

/// Middleware that requires `Authorization: Bearer <token>` and stores the
/// resulting [`VerifiedIdentity`] in the request extensions.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if state.verifier.is_none() {
        tracing::error!("gateway has no token secret configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match authenticate(&state, token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
