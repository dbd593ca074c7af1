// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the engine depends on.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod identity;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use identity::IdentityVerifier;
pub use store::DurableStore;
pub use transport::ChannelTransport;
