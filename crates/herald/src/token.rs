// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald token`: sign a development token with the configured secret.

use chrono::Utc;
use herald_config::HeraldConfig;
use herald_core::HeraldError;
use herald_gateway::{Claims, JwtVerifier};

const SECS_PER_DAY: i64 = 86_400;

pub fn issue_token(
    config: &HeraldConfig,
    sub: &str,
    email: Option<String>,
    days: u32,
) -> Result<String, HeraldError> {
    let secret = config.auth.jwt_secret.as_deref().ok_or_else(|| {
        HeraldError::Config("auth.jwt_secret is not set; cannot sign tokens".into())
    })?;
    if sub.trim().is_empty() {
        return Err(HeraldError::Validation("--sub must not be empty".into()));
    }
    if days == 0 {
        return Err(HeraldError::Validation("--days must be at least 1".into()));
    }

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        email,
        iat: Some(now),
        exp: now + i64::from(days) * SECS_PER_DAY,
        nbf: None,
    };
    JwtVerifier::new(secret.as_bytes(), config.auth.leeway_secs).issue(&claims)
}
