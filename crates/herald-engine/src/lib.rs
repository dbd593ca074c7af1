// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence-aware delivery engine for the Herald notification service.
//!
//! The engine decides, per recipient, whether a notification can be handed
//! to a live channel right now or has to wait in a durable backlog, and
//! replays that backlog when the recipient reconnects:
//!
//! - [`PresenceTracker`] maps a user to the channel handle that reaches them
//! - [`BacklogQueue`] holds undelivered messages per recipient, FIFO
//! - [`MessageRecords`] tracks each message's status
//! - [`DeliveryRouter`] routes single sends and batches
//! - [`CatchUp`] drains a backlog into a fresh channel with pacing
//! - [`NotificationService`] is the command surface over all of the above
//!
//! All shared state lives in the [`herald_core::DurableStore`]; nothing here
//! assumes it is the only engine instance.

pub mod backlog;
pub mod catchup;
pub mod events;
pub mod keys;
pub mod presence;
pub mod records;
pub mod router;
pub mod service;
pub mod stats;
pub mod validation;

pub use backlog::BacklogQueue;
pub use catchup::{CatchUp, CatchUpOutcome, CatchUpReport};
pub use presence::PresenceTracker;
pub use records::MessageRecords;
pub use router::{DeliveryRouter, Routed};
pub use service::NotificationService;
pub use stats::{EngineStats, StatsSnapshot};
