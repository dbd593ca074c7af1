// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! Provides mock adapters and a harness for fast, deterministic tests
//! without a Redis server or a network listener.
//!
//! # Components
//!
//! - [`MockTransport`] - records every event sent, with scriptable failures
//! - [`FaultyStore`] - wraps a real store and injects outages per operation and key
//! - [`EngineHarness`] - a [`herald_engine::NotificationService`] wired to both

pub mod faulty_store;
pub mod harness;
pub mod mock_transport;

pub use faulty_store::{FaultyStore, StoreOp};
pub use harness::{EngineHarness, EngineHarnessBuilder};
pub use mock_transport::{MockTransport, SentEvent};
