// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald notification engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Herald workspace. Store backends, the
//! live-channel gateway and the identity verifier implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HeraldError;
pub use types::{
    AdapterType, BatchReport, Category, ChannelHandle, FailedRecipient, HealthStatus,
    MarkReadOutcome, Message, MessageDraft, MessageId, MessageStatus, PresenceRecord,
    RouteOutcome, RoutedRecipient, VerifiedIdentity,
};

pub use traits::{ChannelTransport, DurableStore, IdentityVerifier, PluginAdapter};
