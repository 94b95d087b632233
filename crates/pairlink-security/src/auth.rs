// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session HMAC token issue and verification.
//!
//! The master secret is generated once at construction and lives only in
//! this process's memory: it is never persisted and never rotated. A
//! restart starts a fresh keying epoch.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use pairlink_core::{PairlinkError, SessionSlot, utc_now_string};
use pairlink_store::Database;
use pairlink_store::queries::conversations::get_conversation;
use rand::RngCore;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies per-conversation-per-session tokens.
pub struct TokenAuthenticator {
    db: Arc<Database>,
    /// Only in memory, never on disk.
    master_secret: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("master_secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenAuthenticator {
    /// Create an authenticator with a fresh random master secret.
    pub fn new(db: Arc<Database>) -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(secret.as_mut());
        Self {
            db,
            master_secret: secret,
        }
    }

    /// Derive a session token: hex HMAC-SHA256 over
    /// `conversation_id:slot:creation_timestamp`, keyed by the master
    /// secret. Always 64 hex characters.
    pub fn issue_token(&self, conversation_id: &str, slot: SessionSlot) -> String {
        let data = format!("{conversation_id}:{slot}:{}", utc_now_string());
        let mut mac = HmacSha256::new_from_slice(self.master_secret.as_ref())
            .expect("HMAC accepts any key length");
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a supplied token against the stored expected token.
    ///
    /// Returns `false` for an unknown conversation, an expired
    /// conversation, or a mismatched token. Callers cannot distinguish
    /// the three; the cause is only logged at debug level.
    pub async fn verify(&self, conversation_id: &str, slot: SessionSlot, token: &str) -> bool {
        let conversation = match get_conversation(&self.db, conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => {
                debug!(conversation_id, "auth failed: conversation not found");
                return false;
            }
            Err(e) => {
                debug!(conversation_id, error = %e, "auth failed: storage error");
                return false;
            }
        };

        if conversation.is_expired(chrono::Utc::now()) {
            debug!(conversation_id, "auth failed: conversation expired");
            return false;
        }

        let expected = conversation.token_for(slot);
        ring::constant_time::verify_slices_are_equal(token.as_bytes(), expected.as_bytes()).is_ok()
    }

    /// Verify, mapping failure to the generic authentication error.
    pub async fn require(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
    ) -> Result<(), PairlinkError> {
        if self.verify(conversation_id, slot, token).await {
            Ok(())
        } else {
            Err(PairlinkError::Auth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlink_core::utc_now_string;
    use pairlink_store::models::Conversation;
    use pairlink_store::queries::conversations::create_conversation;

    async fn setup() -> (Arc<Database>, TokenAuthenticator) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let auth = TokenAuthenticator::new(db.clone());
        (db, auth)
    }

    async fn store_conversation(db: &Database, auth: &TokenAuthenticator, id: &str, expires_at: &str) -> Conversation {
        let conv = Conversation {
            id: id.to_string(),
            session_a_role: "planner".to_string(),
            session_b_role: "builder".to_string(),
            session_a_token: auth.issue_token(id, SessionSlot::A),
            session_b_token: auth.issue_token(id, SessionSlot::B),
            created_at: utc_now_string(),
            expires_at: expires_at.to_string(),
        };
        create_conversation(db, &conv).await.unwrap();
        conv
    }

    #[tokio::test]
    async fn tokens_are_64_hex_chars_and_distinct_per_slot() {
        let (_db, auth) = setup().await;

        let a = auth.issue_token("conv_0123456789abcdef", SessionSlot::A);
        let b = auth.issue_token("conv_0123456789abcdef", SessionSlot::B);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn verify_accepts_exact_token_only() {
        let (db, auth) = setup().await;
        let conv =
            store_conversation(&db, &auth, "conv_0123456789abcdef", "2099-01-01T00:00:00.000Z")
                .await;

        assert!(auth.verify(&conv.id, SessionSlot::A, &conv.session_a_token).await);
        assert!(auth.verify(&conv.id, SessionSlot::B, &conv.session_b_token).await);

        // The partner's token does not authenticate this slot.
        assert!(!auth.verify(&conv.id, SessionSlot::A, &conv.session_b_token).await);
        assert!(!auth.verify(&conv.id, SessionSlot::A, "not-a-token").await);
        assert!(!auth.verify(&conv.id, SessionSlot::A, "").await);
    }

    #[tokio::test]
    async fn verify_fails_for_unknown_conversation() {
        let (_db, auth) = setup().await;
        assert!(!auth.verify("conv_ffffffffffffffff", SessionSlot::A, "x").await);
    }

    #[tokio::test]
    async fn verify_fails_after_expiry() {
        let (db, auth) = setup().await;
        let conv =
            store_conversation(&db, &auth, "conv_0123456789abcdef", "2000-01-01T00:00:00.000Z")
                .await;
        assert!(!auth.verify(&conv.id, SessionSlot::A, &conv.session_a_token).await);
    }

    #[tokio::test]
    async fn require_collapses_to_generic_error() {
        let (_db, auth) = setup().await;
        let err = auth
            .require("conv_ffffffffffffffff", SessionSlot::A, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PairlinkError::Auth));
        assert_eq!(err.to_string(), "authentication failed");
    }
}
