// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread, which makes every store primitive atomic for this process. Other
//! processes sharing the file rely on SQLite's own locking (busy timeout).

use herald_core::HeraldError;
use tracing::debug;

use crate::migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA busy_timeout = 5000;
     PRAGMA foreign_keys = ON;";

/// Convert a tokio-rusqlite error into [`HeraldError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> HeraldError {
    HeraldError::storage(e)
}

/// An open SQLite database with migrations applied.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and run migrations.
    ///
    /// Migrations run on a short-lived blocking connection before the async
    /// connection is handed out.
    pub async fn open(path: &str) -> Result<Self, HeraldError> {
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), HeraldError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(HeraldError::storage)?;
            conn.execute_batch(PRAGMAS).map_err(HeraldError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| HeraldError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| HeraldError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(PRAGMAS) })
            .await
            .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The async connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn close(&self) -> Result<(), HeraldError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");
        Ok(())
    }
}
