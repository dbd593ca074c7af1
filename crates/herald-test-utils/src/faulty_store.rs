// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store wrapper that injects outages and latency.
//!
//! Faults are matched by operation and, optionally, by exact key, so a test
//! can break one recipient's backlog while everything else keeps working.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::{AdapterType, DurableStore, HealthStatus, HeraldError, PluginAdapter};
use herald_storage::MemoryStore;

/// The store primitive a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Set,
    Get,
    Delete,
    PushBack,
    Range,
    Expire,
    Ttl,
    Ping,
}

#[derive(Debug, Clone)]
struct Fault {
    /// `None` matches every operation.
    op: Option<StoreOp>,
    /// `None` matches every key.
    key: Option<String>,
}

impl Fault {
    fn matches(&self, op: StoreOp, key: &str) -> bool {
        self.op.is_none_or(|o| o == op) && self.key.as_deref().is_none_or(|k| k == key)
    }
}

pub struct FaultyStore {
    inner: Arc<dyn DurableStore>,
    faults: Mutex<Vec<Fault>>,
    delays: Mutex<Vec<(StoreOp, Duration)>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn DurableStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
        }
    }

    /// A faulty store in front of a fresh [`MemoryStore`].
    pub fn over_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Fail `op`, on `key` only if given.
    pub async fn fail(&self, op: StoreOp, key: Option<&str>) {
        self.faults.lock().await.push(Fault {
            op: Some(op),
            key: key.map(str::to_string),
        });
    }

    /// Fail every operation on every key.
    pub async fn fail_all(&self) {
        self.faults.lock().await.push(Fault { op: None, key: None });
    }

    /// Remove all injected failures and delays.
    pub async fn heal(&self) {
        self.faults.lock().await.clear();
        self.delays.lock().await.clear();
    }

    /// Make every `op` take at least `delay` before running.
    pub async fn delay(&self, op: StoreOp, delay: Duration) {
        self.delays.lock().await.push((op, delay));
    }

    async fn check(&self, op: StoreOp, key: &str) -> Result<(), HeraldError> {
        let delay = self
            .delays
            .lock()
            .await
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, d)| *d)
            .max();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self.faults.lock().await.iter().any(|f| f.matches(op, key));
        if failing {
            return Err(HeraldError::StoreUnavailable {
                message: format!("injected {op:?} failure on `{key}`"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FaultyStore {
    fn name(&self) -> &str {
        "faulty"
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
impl DurableStore for FaultyStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), HeraldError> {
        self.check(StoreOp::Set, key).await?;
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, HeraldError> {
        self.check(StoreOp::Get, key).await?;
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, HeraldError> {
        self.check(StoreOp::Delete, key).await?;
        self.inner.delete(key).await
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<usize, HeraldError> {
        self.check(StoreOp::PushBack, key).await?;
        self.inner.push_back(key, value).await
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, HeraldError> {
        self.check(StoreOp::Range, key).await?;
        self.inner.range(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, HeraldError> {
        self.check(StoreOp::Expire, key).await?;
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, HeraldError> {
        self.check(StoreOp::Ttl, key).await?;
        self.inner.ttl(key).await
    }

    async fn ping(&self) -> Result<(), HeraldError> {
        self.check(StoreOp::Ping, "").await?;
        self.inner.ping().await
    }
}
