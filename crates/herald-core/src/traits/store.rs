// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store trait: the only state shared between engine instances.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;

/// Key-value/list store reachable by every engine instance.
///
/// Each method is atomic with respect to the single key it touches. No method
/// spans multiple keys and there are no transactions. A key whose expiry has
/// passed behaves exactly like an absent key.
#[async_trait]
pub trait DurableStore: PluginAdapter {
    /// Overwrites `key` with a string value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), HeraldError>;

    /// Reads a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, HeraldError>;

    /// Deletes `key` of any kind. Returns whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool, HeraldError>;

    /// Appends to the tail of the list at `key`, creating it without expiry
    /// if absent. Returns the list length after the append.
    async fn push_back(&self, key: &str, value: &str) -> Result<usize, HeraldError>;

    /// Returns the whole list at `key` in append order, or empty if absent.
    async fn range(&self, key: &str) -> Result<Vec<String>, HeraldError>;

    /// Sets the expiry of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, HeraldError>;

    /// Remaining lifetime of `key`; `None` if absent or without expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, HeraldError>;

    /// Round-trip probe used by health checks.
    async fn ping(&self) -> Result<(), HeraldError>;
}
