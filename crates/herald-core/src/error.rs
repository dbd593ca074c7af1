// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald notification engine.

use thiserror::Error;

/// The primary error type used across all Herald adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store backend errors (query failure, connection failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The durable store could not be reached at all.
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Live-channel transport errors (channel closed, send buffer full).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed or missing request fields. Raised before routing starts.
    #[error("validation error: {0}")]
    Validation(String),

    /// Credential rejected by identity verification.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A referenced entity does not exist (or has expired).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Encoding or decoding of a stored record failed.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Wraps any backend error as a [`HeraldError::Storage`].
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns `true` for errors caused by the durable store rather than the request.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::StoreUnavailable { .. })
    }
}
