// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store backends for the Herald notification engine.
//!
//! Three implementations of [`herald_core::DurableStore`] are provided:
//! an in-process [`MemoryStore`], a file-backed [`SqliteStore`] and, behind
//! the `redis` feature, a shared `RedisStore`. [`open_store`] picks one from
//! configuration.

pub mod database;
pub mod memory;
pub mod migrations;
#[cfg(feature = "redis")]
pub mod redis;
pub mod sqlite;

use std::sync::Arc;

use herald_config::model::{StorageConfig, StoreBackend};
use herald_core::{DurableStore, HeraldError};
use tracing::info;

pub use database::Database;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use sqlite::SqliteStore;

/// An opened store, keeping the concrete type for backend-specific upkeep.
#[derive(Clone)]
pub enum StoreHandle {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
    #[cfg(feature = "redis")]
    Redis(Arc<RedisStore>),
}

impl StoreHandle {
    /// The store as the trait object the engine consumes.
    pub fn durable(&self) -> Arc<dyn DurableStore> {
        match self {
            Self::Memory(s) => s.clone(),
            Self::Sqlite(s) => s.clone(),
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.clone(),
        }
    }

    /// The SQLite store, if that is the active backend. Expired rows there
    /// need a periodic sweep.
    pub fn sqlite(&self) -> Option<&Arc<SqliteStore>> {
        match self {
            Self::Sqlite(s) => Some(s),
            _ => None,
        }
    }
}

/// Open the backend selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<StoreHandle, HeraldError> {
    let handle = match config.backend {
        StoreBackend::Memory => StoreHandle::Memory(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            StoreHandle::Sqlite(Arc::new(SqliteStore::open(&config.database_path).await?))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            StoreHandle::Redis(Arc::new(RedisStore::connect(&config.redis_url).await?))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => {
            return Err(HeraldError::Config(
                "storage.backend = \"redis\" requires building with the `redis` feature".into(),
            ));
        }
    };
    info!(backend = ?config.backend, "durable store opened");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::PluginAdapter;
    use std::time::Duration;

    #[tokio::test]
    async fn memory_backend_from_config() {
        let config = StorageConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let handle = open_store(&config).await.unwrap();
        assert!(handle.sqlite().is_none());
        let store = handle.durable();
        assert_eq!(store.name(), "memory");
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn sqlite_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StoreBackend::Sqlite,
            database_path: dir.path().join("t.db").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let handle = open_store(&config).await.unwrap();
        assert!(handle.sqlite().is_some());
        assert_eq!(handle.durable().name(), "sqlite");
    }
}
