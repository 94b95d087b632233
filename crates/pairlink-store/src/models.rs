// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the bridge database.

use pairlink_core::{SessionSlot, parse_utc};
use serde::{Deserialize, Serialize};

/// A conversation between exactly two sessions. Never mutated after
/// creation; removed only by expiry cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub session_a_role: String,
    pub session_b_role: String,
    pub session_a_token: String,
    pub session_b_token: String,
    pub created_at: String,
    pub expires_at: String,
}

impl Conversation {
    /// The stored expected token for a session slot.
    pub fn token_for(&self, slot: SessionSlot) -> &str {
        match slot {
            SessionSlot::A => &self.session_a_token,
            SessionSlot::B => &self.session_b_token,
        }
    }

    /// Whether the conversation's fixed lifetime has elapsed.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match parse_utc(&self.expires_at) {
            Some(expires) => now > expires,
            // Unparseable expiry is treated as expired, not as immortal.
            None => true,
        }
    }
}

/// A delivered-at-most-once message. `from_session` is "a", "b", or
/// "system" for executor transcripts; `to_session` is always "a" or "b".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: String,
    pub from_session: String,
    pub to_session: String,
    pub body: String,
    pub metadata: Option<String>,
    pub timestamp: String,
    pub read: bool,
}

/// Insert shape for a message; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub from_session: String,
    pub to_session: String,
    pub body: String,
    pub metadata: Option<String>,
    pub timestamp: String,
}

/// One status row per (conversation, session), upserted on every update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusRow {
    pub conversation_id: String,
    pub session_id: String,
    pub status: String,
    pub last_heartbeat: String,
}

/// An append-only audit record. `details` is serialized JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub conversation_id: Option<String>,
    pub session_id: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub timestamp: String,
}
