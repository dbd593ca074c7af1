// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local [`DurableStore`] backed by a `DashMap`.
//!
//! Suitable for single-instance deployments and tests. Expiry is lazy: an
//! expired entry is dropped the next time its key is touched. Deadlines use
//! `tokio::time::Instant`, so paused-clock tests can fast-forward TTLs.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use herald_core::{AdapterType, DurableStore, HealthStatus, HeraldError, PluginAdapter};

#[derive(Debug, Clone)]
enum SlotValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str) -> HeraldError {
    HeraldError::Storage {
        source: format!("WRONGTYPE key `{key}` holds a string, not a list").into(),
    }
}

/// In-memory durable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys. Expired-but-untouched keys are not counted.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the slot at `key` if it is live, evicting it if expired.
    fn live(&self, key: &str) -> Option<Slot> {
        let now = Instant::now();
        let slot = self.entries.get(key).map(|s| s.clone())?;
        if slot.is_expired(now) {
            self.entries.remove_if(key, |_, s| s.is_expired(now));
            return None;
        }
        Some(slot)
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), HeraldError> {
        self.entries.insert(
            key.to_string(),
            Slot {
                value: SlotValue::Text(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, HeraldError> {
        match self.live(key) {
            Some(Slot {
                value: SlotValue::Text(text),
                ..
            }) => Ok(Some(text)),
            Some(_) => Err(HeraldError::Storage {
                source: format!("WRONGTYPE key `{key}` holds a list, not a string").into(),
            }),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, HeraldError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<usize, HeraldError> {
        let now = Instant::now();
        let mut slot = self.entries.entry(key.to_string()).or_insert_with(|| Slot {
            value: SlotValue::List(Vec::new()),
            expires_at: None,
        });
        if slot.is_expired(now) {
            *slot = Slot {
                value: SlotValue::List(Vec::new()),
                expires_at: None,
            };
        }
        match &mut slot.value {
            SlotValue::List(items) => {
                items.push(value.to_string());
                Ok(items.len())
            }
            SlotValue::Text(_) => Err(wrong_type(key)),
        }
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, HeraldError> {
        match self.live(key) {
            Some(Slot {
                value: SlotValue::List(items),
                ..
            }) => Ok(items),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, HeraldError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut slot) if !slot.is_expired(now) => {
                slot.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, HeraldError> {
        let now = Instant::now();
        Ok(self
            .live(key)
            .and_then(|slot| slot.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn ping(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}
