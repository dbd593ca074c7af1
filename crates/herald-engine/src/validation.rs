// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request validation. Runs before routing, so a rejected request never
//! touches presence or the backlog.

use std::collections::HashSet;
use std::time::Duration;

use herald_core::types::{MAX_BODY_CHARS, MAX_TITLE_CHARS};
use herald_core::{HeraldError, MessageDraft};

/// Longest relative expiry a message may ask for.
pub const MAX_EXPIRES_IN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Blank after trimming is empty; the limit counts the stored, untrimmed text.
fn bounded(field: &str, value: &str, max: usize) -> Result<(), HeraldError> {
    if value.trim().is_empty() {
        return Err(HeraldError::Validation(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > max {
        return Err(HeraldError::Validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Check the content shared by every recipient of a send.
pub fn validate_draft(draft: &MessageDraft) -> Result<(), HeraldError> {
    bounded("title", &draft.title, MAX_TITLE_CHARS)?;
    bounded("body", &draft.body, MAX_BODY_CHARS)?;
    if draft.expires_in == Some(Duration::ZERO) {
        return Err(HeraldError::Validation(
            "expiresIn must be greater than zero".into(),
        ));
    }
    if draft.expires_in.is_some_and(|d| d > MAX_EXPIRES_IN) {
        return Err(HeraldError::Validation(format!(
            "expiresIn must be at most {} seconds",
            MAX_EXPIRES_IN.as_secs()
        )));
    }
    if let Some(sender) = &draft.sender_id {
        if sender.trim().is_empty() {
            return Err(HeraldError::Validation("senderId must not be blank".into()));
        }
    }
    Ok(())
}

pub fn validate_recipient(recipient_id: &str) -> Result<(), HeraldError> {
    if recipient_id.trim().is_empty() {
        return Err(HeraldError::Validation(
            "recipientId must not be empty".into(),
        ));
    }
    Ok(())
}

/// Check a batch recipient list: non-empty, bounded, no blanks, no duplicates.
pub fn validate_recipients(recipient_ids: &[String], max_batch_size: usize) -> Result<(), HeraldError> {
    if recipient_ids.is_empty() {
        return Err(HeraldError::Validation(
            "recipientIds must contain at least one recipient".into(),
        ));
    }
    if recipient_ids.len() > max_batch_size {
        return Err(HeraldError::Validation(format!(
            "recipientIds exceeds the batch limit of {max_batch_size} (got {})",
            recipient_ids.len()
        )));
    }
    let mut seen = HashSet::with_capacity(recipient_ids.len());
    for id in recipient_ids {
        validate_recipient(id)?;
        if !seen.insert(id.as_str()) {
            return Err(HeraldError::Validation(format!(
                "duplicate recipient `{id}`"
            )));
        }
    }
    Ok(())
}
