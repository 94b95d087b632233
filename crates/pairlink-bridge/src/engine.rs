// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic message operations between the two sessions of a conversation.
//!
//! Order of checks in `send` is fixed: rate limit, then authentication,
//! then redaction, then persistence. Rate-limit and auth failures
//! short-circuit before any redaction or persistence work, and both are
//! still written to the audit trail.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pairlink_core::{
    LIVENESS_WINDOW_SECS, PairlinkError, SessionSlot, SessionState, new_conversation_id,
    parse_utc, utc_now_string,
};
use pairlink_security::{RateLimiter, TokenAuthenticator, redact};
use pairlink_store::models::{Conversation, NewMessage, SessionStatusRow};
use pairlink_store::queries::{audit, conversations, messages, status};
use pairlink_store::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::validate;

/// Credentials handed back from conversation creation. Each token must be
/// delivered to its session over a secure channel; the bridge never
/// returns them again.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationCredentials {
    pub conversation_id: String,
    pub session_a_token: String,
    pub session_b_token: String,
    pub expires_at: String,
}

/// Structured metadata attached to a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default)]
    pub files_involved: Vec<String>,
}

/// Result of a send: whether redaction altered the content. The transport
/// should warn the sender when it did.
#[derive(Debug, Clone, Copy)]
pub struct SendReceipt {
    pub redacted: bool,
}

/// A message as handed to the receiving session.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedMessage {
    pub id: i64,
    pub from: String,
    pub body: String,
    pub metadata: serde_json::Value,
    pub timestamp: String,
}

/// Partner status with derived liveness.
#[derive(Debug, Clone, Serialize)]
pub struct PartnerStatus {
    pub status: String,
    pub last_heartbeat: Option<String>,
    pub age_seconds: Option<i64>,
    pub alive: bool,
}

/// Send/receive/status operations, shared by both sessions.
pub struct MessagingEngine {
    db: Arc<Database>,
    auth: Arc<TokenAuthenticator>,
    limiter: Arc<RateLimiter>,
    conversation_ttl: Duration,
}

impl MessagingEngine {
    pub fn new(
        db: Arc<Database>,
        auth: Arc<TokenAuthenticator>,
        limiter: Arc<RateLimiter>,
        conversation_ttl: Duration,
    ) -> Self {
        Self {
            db,
            auth,
            limiter,
            conversation_ttl,
        }
    }

    /// Create a conversation and issue both session tokens.
    pub async fn create_conversation(
        &self,
        session_a_role: &str,
        session_b_role: &str,
    ) -> Result<ConversationCredentials, PairlinkError> {
        validate::check_role("my_role", session_a_role)?;
        validate::check_role("partner_role", session_b_role)?;

        let id = new_conversation_id();
        let token_a = self.auth.issue_token(&id, SessionSlot::A);
        let token_b = self.auth.issue_token(&id, SessionSlot::B);

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.conversation_ttl)
            .map_err(|e| PairlinkError::Config(format!("conversation ttl out of range: {e}")))?;
        let expires_at = (now + ttl).to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let conversation = Conversation {
            id: id.clone(),
            session_a_role: session_a_role.to_string(),
            session_b_role: session_b_role.to_string(),
            session_a_token: token_a.clone(),
            session_b_token: token_b.clone(),
            created_at: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            expires_at: expires_at.clone(),
        };
        conversations::create_conversation(&self.db, &conversation).await?;

        audit::append_audit(
            &self.db,
            Some(&id),
            None,
            "create_conversation",
            json!({"roles": [session_a_role, session_b_role]}),
        )
        .await?;

        info!(conversation_id = %id, "conversation created");
        Ok(ConversationCredentials {
            conversation_id: id,
            session_a_token: token_a,
            session_b_token: token_b,
            expires_at,
        })
    }

    /// Send a message to the partner session.
    pub async fn send(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        body: &str,
        metadata: MessageMetadata,
    ) -> Result<SendReceipt, PairlinkError> {
        validate::check_conversation_id(conversation_id)?;
        validate::check_token_shape(token)?;
        validate::check_message(body)?;
        validate::check_metadata(&metadata)?;

        let session_label = slot.to_string();
        if let Err(e) = self.limiter.check(&session_label) {
            audit::append_audit(
                &self.db,
                Some(conversation_id),
                Some(&session_label),
                "rate_limited",
                json!({"operation": "send_message"}),
            )
            .await?;
            return Err(e);
        }

        self.authenticate(conversation_id, slot, token, "send_message").await?;

        let redacted_body = redact(body);
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| PairlinkError::Validation(format!("metadata serialization: {e}")))?;
        let redacted_metadata = redact(&metadata_json);
        let was_redacted = redacted_body != body || redacted_metadata != metadata_json;

        let message = NewMessage {
            conversation_id: conversation_id.to_string(),
            from_session: session_label.clone(),
            to_session: slot.partner().to_string(),
            body: redacted_body.clone(),
            metadata: Some(redacted_metadata),
            timestamp: utc_now_string(),
        };
        messages::insert_message(&self.db, &message).await?;

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&session_label),
            "send_message",
            json!({
                "to": slot.partner().to_string(),
                "message_length": redacted_body.chars().count(),
                "redacted": was_redacted,
            }),
        )
        .await?;

        debug!(conversation_id, from = %session_label, redacted = was_redacted, "message sent");
        Ok(SendReceipt {
            redacted: was_redacted,
        })
    }

    /// Return all unread messages for this session and mark them read, in
    /// one transaction. A message is delivered at most once.
    pub async fn receive(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
    ) -> Result<Vec<ReceivedMessage>, PairlinkError> {
        validate::check_conversation_id(conversation_id)?;
        validate::check_token_shape(token)?;

        self.authenticate(conversation_id, slot, token, "get_messages").await?;

        let session_label = slot.to_string();
        let rows = messages::take_unread(&self.db, conversation_id, &session_label).await?;
        let received: Vec<ReceivedMessage> = rows
            .into_iter()
            .map(|row| {
                let metadata = row
                    .metadata
                    .as_deref()
                    .map(|raw| {
                        serde_json::from_str(raw)
                            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
                    })
                    .unwrap_or(serde_json::Value::Null);
                ReceivedMessage {
                    id: row.id,
                    from: row.from_session,
                    body: row.body,
                    metadata,
                    timestamp: row.timestamp,
                }
            })
            .collect();

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&session_label),
            "get_messages",
            json!({"count": received.len()}),
        )
        .await?;

        Ok(received)
    }

    /// Upsert this session's status with a fresh heartbeat.
    pub async fn update_status(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        state: SessionState,
    ) -> Result<(), PairlinkError> {
        validate::check_conversation_id(conversation_id)?;
        validate::check_token_shape(token)?;

        self.authenticate(conversation_id, slot, token, "update_status").await?;

        let session_label = slot.to_string();
        let row = SessionStatusRow {
            conversation_id: conversation_id.to_string(),
            session_id: session_label.clone(),
            status: state.to_string(),
            last_heartbeat: utc_now_string(),
        };
        status::upsert_status(&self.db, &row).await?;

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&session_label),
            "update_status",
            json!({"status": state.to_string()}),
        )
        .await?;
        Ok(())
    }

    /// Read the partner's status. Liveness is derived from heartbeat age,
    /// never stored.
    pub async fn partner_status(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
    ) -> Result<PartnerStatus, PairlinkError> {
        validate::check_conversation_id(conversation_id)?;
        validate::check_token_shape(token)?;

        self.authenticate(conversation_id, slot, token, "get_partner_status").await?;

        let partner = slot.partner().to_string();
        let row = status::get_status(&self.db, conversation_id, &partner).await?;

        Ok(match row {
            Some(row) => {
                let age_seconds = parse_utc(&row.last_heartbeat)
                    .map(|heartbeat| (Utc::now() - heartbeat).num_seconds());
                let alive = age_seconds
                    .map(|age| age < LIVENESS_WINDOW_SECS)
                    .unwrap_or(false);
                PartnerStatus {
                    status: row.status,
                    last_heartbeat: Some(row.last_heartbeat),
                    age_seconds,
                    alive,
                }
            }
            None => PartnerStatus {
                status: "unknown".to_string(),
                last_heartbeat: None,
                age_seconds: None,
                alive: false,
            },
        })
    }

    /// Verify the session token, auditing the denial on failure.
    pub(crate) async fn authenticate(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        operation: &str,
    ) -> Result<(), PairlinkError> {
        if self.auth.verify(conversation_id, slot, token).await {
            Ok(())
        } else {
            audit::append_audit(
                &self.db,
                Some(conversation_id),
                Some(&slot.to_string()),
                "auth_failed",
                json!({"operation": operation}),
            )
            .await?;
            Err(PairlinkError::Auth)
        }
    }
}
