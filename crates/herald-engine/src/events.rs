// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event names and payloads pushed to live channels.

use chrono::{DateTime, Utc};
use herald_core::{HeraldError, Message, MessageId};
use serde_json::{Value, json};

/// A notification, freshly routed or replayed from the backlog.
pub const NOTIFICATION: &str = "notification";
/// End of a catch-up pass; carries the number of replayed messages.
pub const CATCHUP_COMPLETE: &str = "catchup_complete";
/// Confirmation sent to the reader after a successful mark-read.
pub const READ_RECEIPT: &str = "read_receipt";

/// Message JSON with a `catchUp` flag telling the client how it arrived.
pub fn notification(message: &Message, catch_up: bool) -> Result<Value, HeraldError> {
    let mut value = serde_json::to_value(message)?;
    if let Value::Object(map) = &mut value {
        map.insert("catchUp".into(), Value::Bool(catch_up));
    }
    Ok(value)
}

pub fn catchup_complete(count: usize) -> Value {
    json!({ "count": count })
}

pub fn read_receipt(message_id: &MessageId, read_at: DateTime<Utc>) -> Value {
    json!({ "messageId": message_id, "readAt": read_at })
}
