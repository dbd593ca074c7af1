// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Herald notification engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// HTTP/WebSocket listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Durable store backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Presence tracking settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Offline backlog settings.
    #[serde(default)]
    pub backlog: BacklogConfig,

    /// Message record settings.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Reconnection catch-up settings.
    #[serde(default)]
    pub catchup: CatchUpConfig,

    /// Routing settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP/WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Token verification configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret. `None` rejects every authenticated request.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Clock skew tolerated when checking `exp`/`nbf`, in seconds.
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            leeway_secs: default_leeway_secs(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[redacted]"))
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

fn default_leeway_secs() -> u64 {
    30
}

/// Which durable store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store. Only correct for a single instance.
    Memory,
    /// SQLite file shared by instances on one host.
    #[default]
    Sqlite,
    /// Redis server shared by all instances.
    Redis,
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
            redis_url: default_redis_url(),
        }
    }
}

fn default_database_path() -> String {
    "herald.db".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Presence tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Lifetime of a presence record when teardown is never observed.
    #[serde(default = "default_presence_ttl_secs")]
    pub ttl_secs: u64,

    /// Lookups slower than this are treated as "offline".
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_presence_ttl_secs(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl PresenceConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

fn default_presence_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_lookup_timeout_ms() -> u64 {
    500
}

/// Offline backlog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BacklogConfig {
    /// Retention applied to a backlog when the newest message has no explicit expiry.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
        }
    }
}

impl BacklogConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

fn default_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

/// Message record configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// How long the status-tracking record of a message is kept.
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            record_ttl_secs: default_record_ttl_secs(),
        }
    }
}

impl MessagesConfig {
    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs)
    }
}

fn default_record_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// Reconnection catch-up configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatchUpConfig {
    /// Minimum spacing between successive backlog deliveries.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for CatchUpConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl CatchUpConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

fn default_pacing_ms() -> u64 {
    100
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Largest recipient list accepted by a batch send.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Recipients routed in parallel within one batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_concurrency() -> usize {
    16
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
