// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence tracker: which channel handle, if any, currently reaches a user.
//!
//! Records live at `presence:<userId>` with a bounded TTL so that a crashed
//! instance cannot leave a user "online" forever. A new registration
//! overwrites the previous one (last writer wins).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_core::{ChannelHandle, DurableStore, HeraldError, PresenceRecord};
use tracing::{debug, warn};

use crate::keys;

pub struct PresenceTracker {
    store: Arc<dyn DurableStore>,
    ttl: Duration,
    lookup_timeout: Duration,
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn DurableStore>, ttl: Duration, lookup_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            lookup_timeout,
        }
    }

    /// Overwrite the user's presence with `handle` and a fresh `connected_at`.
    ///
    /// Store failures propagate.
    pub async fn register(
        &self,
        user_id: &str,
        handle: &ChannelHandle,
    ) -> Result<PresenceRecord, HeraldError> {
        let record = PresenceRecord {
            user_id: user_id.to_string(),
            channel_handle: handle.clone(),
            connected_at: Utc::now(),
            is_active: true,
        };
        let value = serde_json::to_string(&record)?;
        self.store
            .set(&keys::presence(user_id), &value, self.ttl)
            .await?;
        debug!(user_id, handle = %handle, "presence registered");
        Ok(record)
    }

    /// Delete the user's presence record. A missing record is not an error.
    pub async fn unregister(&self, user_id: &str) -> Result<(), HeraldError> {
        let removed = self.store.delete(&keys::presence(user_id)).await?;
        debug!(user_id, removed, "presence unregistered");
        Ok(())
    }

    /// Delete the user's presence record only if it still points at `handle`.
    ///
    /// Used on channel teardown so a slow-closing old connection does not
    /// erase the record of a newer one. The read and delete are separate
    /// store calls; a registration landing between them is still removed.
    pub async fn unregister_handle(
        &self,
        user_id: &str,
        handle: &ChannelHandle,
    ) -> Result<bool, HeraldError> {
        let key = keys::presence(user_id);
        let current = match self.store.get(&key).await? {
            Some(raw) => serde_json::from_str::<PresenceRecord>(&raw).ok(),
            None => return Ok(false),
        };
        match current {
            Some(record) if record.channel_handle != *handle => {
                debug!(user_id, handle = %handle, "presence owned by newer channel, keeping");
                Ok(false)
            }
            _ => {
                self.store.delete(&key).await?;
                debug!(user_id, handle = %handle, "presence unregistered");
                Ok(true)
            }
        }
    }

    /// Current handle for the user, or `None`.
    ///
    /// Never fails: store errors, undecodable records and lookups slower than
    /// the configured timeout all count as offline.
    pub async fn lookup(&self, user_id: &str) -> Option<ChannelHandle> {
        let key = keys::presence(user_id);
        let raw = match tokio::time::timeout(self.lookup_timeout, self.store.get(&key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                warn!(user_id, error = %e, "presence lookup failed, treating as offline");
                return None;
            }
            Err(_) => {
                warn!(
                    user_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "presence lookup timed out, treating as offline"
                );
                return None;
            }
        };
        match serde_json::from_str::<PresenceRecord>(&raw) {
            Ok(record) if record.is_active => Some(record.channel_handle),
            Ok(_) => None,
            Err(e) => {
                warn!(user_id, error = %e, "undecodable presence record, treating as offline");
                None
            }
        }
    }
}
