// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`DurableStore`].
//!
//! Expiry is stored as unix milliseconds. Reads filter expired rows; writes
//! purge the touched key's expired rows inside the same transaction, and
//! [`SqliteStore::purge_all_expired`] sweeps everything else periodically.

use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::debug;

use herald_core::{AdapterType, DurableStore, HealthStatus, HeraldError, PluginAdapter};

use crate::database::{Database, map_tr_err};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn deadline_ms(now: i64, ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_add(ttl)
}

/// Drop expired rows for `key` so the rest of the transaction sees live state only.
fn purge_key(tx: &Transaction<'_>, key: &str, now: i64) -> Result<(), rusqlite::Error> {
    tx.execute(
        "DELETE FROM kv_strings WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
        params![key, now],
    )?;
    let dropped = tx.execute(
        "DELETE FROM kv_lists WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
        params![key, now],
    )?;
    if dropped > 0 {
        tx.execute("DELETE FROM kv_list_items WHERE list_key = ?1", params![key])?;
    }
    Ok(())
}

/// Durable store persisted in a single SQLite file.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, HeraldError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    pub fn path(&self) -> &str {
        self.db.path()
    }

    /// Delete every expired string, list and list item. Returns the number of
    /// keys removed.
    pub async fn purge_all_expired(&self) -> Result<usize, HeraldError> {
        let now = now_ms();
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let strings = tx.execute(
                    "DELETE FROM kv_strings WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                tx.execute(
                    "DELETE FROM kv_list_items WHERE list_key IN \
                     (SELECT key FROM kv_lists WHERE expires_at IS NOT NULL AND expires_at <= ?1)",
                    params![now],
                )?;
                let lists = tx.execute(
                    "DELETE FROM kv_lists WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                tx.commit()?;
                Ok(strings + lists)
            })
            .await
            .map_err(map_tr_err)?;
        if removed > 0 {
            debug!(removed, "purged expired keys");
        }
        Ok(removed)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
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

    async fn shutdown(&self) -> Result<(), HeraldError> {
        self.db.close().await
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), HeraldError> {
        let key = key.to_string();
        let value = value.to_string();
        let expires_at = deadline_ms(now_ms(), ttl);
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM kv_list_items WHERE list_key = ?1", params![key])?;
                tx.execute("DELETE FROM kv_lists WHERE key = ?1", params![key])?;
                tx.execute(
                    "INSERT INTO kv_strings (key, value, expires_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                    params![key, value, expires_at],
                )?;
                tx.commit()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, HeraldError> {
        let key = key.to_string();
        let now = now_ms();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM kv_strings
                     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, HeraldError> {
        let key = key.to_string();
        let now = now_ms();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                purge_key(&tx, &key, now)?;
                let strings = tx.execute("DELETE FROM kv_strings WHERE key = ?1", params![key])?;
                tx.execute("DELETE FROM kv_list_items WHERE list_key = ?1", params![key])?;
                let lists = tx.execute("DELETE FROM kv_lists WHERE key = ?1", params![key])?;
                tx.commit()?;
                Ok(strings + lists > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<usize, HeraldError> {
        let list_key = key.to_string();
        let value = value.to_string();
        let now = now_ms();
        // `None` means the key holds a live string.
        let len = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<usize>, rusqlite::Error> {
                let tx = conn.transaction()?;
                purge_key(&tx, &list_key, now)?;
                let is_string: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM kv_strings WHERE key = ?1)",
                    params![list_key],
                    |row| row.get(0),
                )?;
                if is_string {
                    return Ok(None);
                }
                tx.execute(
                    "INSERT OR IGNORE INTO kv_lists (key, expires_at) VALUES (?1, NULL)",
                    params![list_key],
                )?;
                tx.execute(
                    "INSERT INTO kv_list_items (list_key, value) VALUES (?1, ?2)",
                    params![list_key, value],
                )?;
                let len: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM kv_list_items WHERE list_key = ?1",
                    params![list_key],
                    |row| row.get(0),
                )?;
                tx.commit()?;
                Ok(Some(usize::try_from(len).unwrap_or(0)))
            })
            .await
            .map_err(map_tr_err)?;
        len.ok_or_else(|| HeraldError::Storage {
            source: format!("WRONGTYPE key `{key}` holds a string, not a list").into(),
        })
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, HeraldError> {
        let key = key.to_string();
        let now = now_ms();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare_cached(
                    "SELECT i.value FROM kv_list_items i
                     JOIN kv_lists l ON l.key = i.list_key
                     WHERE l.key = ?1 AND (l.expires_at IS NULL OR l.expires_at > ?2)
                     ORDER BY i.seq",
                )?;
                let items = stmt
                    .query_map(params![key, now], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, HeraldError> {
        let key = key.to_string();
        let now = now_ms();
        let expires_at = deadline_ms(now, ttl);
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                purge_key(&tx, &key, now)?;
                let strings = tx.execute(
                    "UPDATE kv_strings SET expires_at = ?2 WHERE key = ?1",
                    params![key, expires_at],
                )?;
                let lists = tx.execute(
                    "UPDATE kv_lists SET expires_at = ?2 WHERE key = ?1",
                    params![key, expires_at],
                )?;
                tx.commit()?;
                Ok(strings + lists > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, HeraldError> {
        let key = key.to_string();
        let now = now_ms();
        let expires_at = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<Option<i64>>, rusqlite::Error> {
                conn.query_row(
                    "SELECT expires_at FROM kv_strings
                       WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)
                     UNION ALL
                     SELECT expires_at FROM kv_lists
                       WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)
                     LIMIT 1",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(expires_at
            .flatten()
            .map(|at| Duration::from_millis(u64::try_from(at - now).unwrap_or(0))))
    }

    async fn ping(&self) -> Result<(), HeraldError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(())
    }
}
