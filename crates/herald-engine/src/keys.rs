// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store key layout. Other tooling reads these keys directly, so the
//! shapes are part of the external contract.

use herald_core::MessageId;

pub const PRESENCE_PREFIX: &str = "presence:";
pub const BACKLOG_PREFIX: &str = "backlog:";
pub const MESSAGE_PREFIX: &str = "message:";

pub fn presence(user_id: &str) -> String {
    format!("{PRESENCE_PREFIX}{user_id}")
}

pub fn backlog(user_id: &str) -> String {
    format!("{BACKLOG_PREFIX}{user_id}")
}

pub fn message(id: &MessageId) -> String {
    format!("{MESSAGE_PREFIX}{id}")
}
