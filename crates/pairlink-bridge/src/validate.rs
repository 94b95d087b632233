// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary validation of transport-supplied arguments.
//!
//! These checks mirror the constraints the transport declares in its tool
//! schemas, so a misbehaving caller is stopped here even when the schema
//! layer did not.

use pairlink_core::{PairlinkError, is_valid_conversation_id};

use crate::engine::MessageMetadata;

pub(crate) const MAX_MESSAGE_CHARS: usize = 50_000;
pub(crate) const MAX_COMMAND_CHARS: usize = 1_000;
pub(crate) const MAX_FILES_INVOLVED: usize = 20;
pub(crate) const ACTION_TYPES: [&str; 5] = ["question", "info", "proposal", "blocked", "complete"];

pub(crate) fn check_role(label: &str, role: &str) -> Result<(), PairlinkError> {
    let len = role.chars().count();
    if !(3..=100).contains(&len) {
        return Err(PairlinkError::Validation(format!(
            "{label} must be 3-100 characters, got {len}"
        )));
    }
    Ok(())
}

pub(crate) fn check_conversation_id(id: &str) -> Result<(), PairlinkError> {
    if !is_valid_conversation_id(id) {
        return Err(PairlinkError::Validation(
            "conversation_id must match conv_<16 hex>".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_token_shape(token: &str) -> Result<(), PairlinkError> {
    if token.len() != 64 {
        return Err(PairlinkError::Validation(
            "token must be exactly 64 characters".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_message(body: &str) -> Result<(), PairlinkError> {
    let len = body.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(PairlinkError::Validation(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters ({len})"
        )));
    }
    Ok(())
}

pub(crate) fn check_command(command: &str) -> Result<(), PairlinkError> {
    let len = command.chars().count();
    if len > MAX_COMMAND_CHARS {
        return Err(PairlinkError::Validation(format!(
            "command exceeds {MAX_COMMAND_CHARS} characters ({len})"
        )));
    }
    Ok(())
}

pub(crate) fn check_metadata(metadata: &MessageMetadata) -> Result<(), PairlinkError> {
    if let Some(action_type) = &metadata.action_type
        && !ACTION_TYPES.contains(&action_type.as_str())
    {
        return Err(PairlinkError::Validation(format!(
            "action_type must be one of {ACTION_TYPES:?}"
        )));
    }
    if metadata.files_involved.len() > MAX_FILES_INVOLVED {
        return Err(PairlinkError::Validation(format!(
            "files_involved exceeds {MAX_FILES_INVOLVED} entries"
        )));
    }
    Ok(())
}
