// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: non-zero lifetimes,
//! positive concurrency, backend-specific settings being present.

use crate::diagnostic::ConfigError;
use crate::model::{HeraldConfig, StoreBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if let Some(secret) = &config.auth.jwt_secret {
        if secret.trim().is_empty() {
            fail("auth.jwt_secret must not be blank when set".to_string());
        }
    }

    match config.storage.backend {
        StoreBackend::Sqlite if config.storage.database_path.trim().is_empty() => {
            fail("storage.database_path must not be empty for the sqlite backend".to_string());
        }
        StoreBackend::Redis if !config.storage.redis_url.starts_with("redis") => {
            fail(format!(
                "storage.redis_url `{}` must use the redis:// or rediss:// scheme",
                config.storage.redis_url
            ));
        }
        _ => {}
    }

    let lifetimes = [
        ("presence.ttl_secs", config.presence.ttl_secs),
        ("presence.lookup_timeout_ms", config.presence.lookup_timeout_ms),
        ("backlog.retention_secs", config.backlog.retention_secs),
        ("messages.record_ttl_secs", config.messages.record_ttl_secs),
    ];
    for (key, value) in lifetimes {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if config.delivery.concurrency == 0 {
        fail("delivery.concurrency must be at least 1".to_string());
    }
    if config.delivery.max_batch_size == 0 {
        fail("delivery.max_batch_size must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "log.level `{}` must be one of: {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&HeraldConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = HeraldConfig::default();
        config.server.host = String::new();
        config.delivery.concurrency = 0;
        config.presence.ttl_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn redis_backend_requires_redis_url() {
        let mut config = HeraldConfig::default();
        config.storage.backend = StoreBackend::Redis;
        config.storage.redis_url = "http://localhost".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("redis_url"));
    }

    #[test]
    fn blank_secret_rejected() {
        let mut config = HeraldConfig::default();
        config.auth.jwt_secret = Some("   ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_log_level_rejected() {
        let mut config = HeraldConfig::default();
        config.log.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
