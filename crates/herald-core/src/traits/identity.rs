// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity verification trait.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::VerifiedIdentity;

/// Turns a credential into a verified identity, or rejects it with
/// [`HeraldError::Auth`]. The engine only ever sees the resulting user id.
#[async_trait]
pub trait IdentityVerifier: PluginAdapter {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, HeraldError>;
}
