// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed [`DurableStore`] for multi-instance deployments.
//!
//! Every primitive maps to a single Redis command, so per-key atomicity comes
//! from the server. The multiplexed connection is cloned per call.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

use herald_core::{AdapterType, DurableStore, HealthStatus, HeraldError, PluginAdapter};

fn map_redis_err(e: redis::RedisError) -> HeraldError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        HeraldError::StoreUnavailable {
            message: e.to_string(),
        }
    } else {
        HeraldError::storage(e)
    }
}

fn millis(ttl: Duration) -> u64 {
    // PX/PEXPIRE reject zero.
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Durable store hosted in Redis.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, HeraldError> {
        let client = redis::Client::open(url).map_err(map_redis_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_err)?;
        info!(url, "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl PluginAdapter for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        match self.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl DurableStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), HeraldError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, HeraldError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, HeraldError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(removed > 0)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<usize, HeraldError> {
        let mut conn = self.conn.clone();
        let len: usize = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(len)
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, HeraldError> {
        let mut conn = self.conn.clone();
        let items: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(items)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, HeraldError> {
        let mut conn = self.conn.clone();
        let applied: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(applied == 1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, HeraldError> {
        let mut conn = self.conn.clone();
        // -2: absent, -1: no expiry.
        let remaining: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(u64::try_from(remaining).ok().map(Duration::from_millis))
    }

    async fn ping(&self) -> Result<(), HeraldError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_is_clamped() {
        assert_eq!(millis(Duration::ZERO), 1);
        assert_eq!(millis(Duration::from_secs(2)), 2000);
    }

    #[tokio::test]
    async fn connect_to_closed_port_is_unavailable() {
        let err = match RedisStore::connect("redis://127.0.0.1:1").await {
            Ok(_) => panic!("nothing listens on port 1"),
            Err(e) => e,
        };
        assert!(err.is_store_failure());
    }
}
