// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Pairlink workspace.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the exactly two parties in a conversation, addressed as "a" or "b".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionSlot {
    A,
    B,
}

impl SessionSlot {
    /// The other party in the conversation.
    pub fn partner(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Command-execution policy mode for a conversation.
///
/// `Safe` admits only a fixed read-only utility set, `Restricted` adds a
/// utility/subcommand allow-map, `Yolo` admits anything the denylist does
/// not block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    Safe,
    Restricted,
    Yolo,
}

/// Self-reported session state, upserted with a heartbeat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Working,
    Waiting,
    Blocked,
    Complete,
}

/// Heartbeats older than this are considered dead.
pub const LIVENESS_WINDOW_SECS: i64 = 120;

/// Generate a fresh unguessable conversation id of the shape `conv_<16 hex>`.
pub fn new_conversation_id() -> String {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("conv_{}", hex::encode(bytes))
}

/// Check a caller-supplied conversation id against the `conv_<16 hex>` shape.
pub fn is_valid_conversation_id(id: &str) -> bool {
    match id.strip_prefix("conv_") {
        Some(rest) => {
            rest.len() == 16
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// All persisted timestamps use this format so lexicographic ordering in
/// SQL matches chronological ordering.
pub fn utc_now_string() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a timestamp previously produced by [`utc_now_string`].
pub fn parse_utc(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn slot_partner_flips() {
        assert_eq!(SessionSlot::A.partner(), SessionSlot::B);
        assert_eq!(SessionSlot::B.partner(), SessionSlot::A);
    }

    #[test]
    fn slot_round_trips_through_strings() {
        for slot in [SessionSlot::A, SessionSlot::B] {
            let s = slot.to_string();
            assert_eq!(SessionSlot::from_str(&s).unwrap(), slot);
        }
        assert_eq!(SessionSlot::A.to_string(), "a");
    }

    #[test]
    fn exec_mode_parses_lowercase() {
        assert_eq!(ExecMode::from_str("safe").unwrap(), ExecMode::Safe);
        assert_eq!(ExecMode::from_str("restricted").unwrap(), ExecMode::Restricted);
        assert_eq!(ExecMode::from_str("yolo").unwrap(), ExecMode::Yolo);
        assert!(ExecMode::from_str("YOLO!").is_err());
    }

    #[test]
    fn conversation_id_shape() {
        let id = new_conversation_id();
        assert!(is_valid_conversation_id(&id), "generated id {id} should validate");

        assert!(is_valid_conversation_id("conv_0123456789abcdef"));
        assert!(!is_valid_conversation_id("conv_0123456789ABCDEF"));
        assert!(!is_valid_conversation_id("conv_0123"));
        assert!(!is_valid_conversation_id("conv_0123456789abcdef0"));
        assert!(!is_valid_conversation_id("chat_0123456789abcdef"));
        assert!(!is_valid_conversation_id(""));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = new_conversation_id();
        let b = new_conversation_id();
        assert_ne!(a, b);
    }

    #[test]
    fn timestamps_round_trip_and_order() {
        let earlier = utc_now_string();
        let parsed = parse_utc(&earlier).unwrap();
        let later = utc_now_string();
        assert!(parsed <= chrono::Utc::now());
        // Lexicographic order matches chronological order for this format.
        assert!(earlier <= later);
    }
}
