// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-use, time-limited approval tokens.
//!
//! Tokens live in a small JSON file keyed by token value, created with
//! owner-only permissions. Validation consumes the token: the
//! read-decide-mark-save sequence runs under one lock, so concurrent
//! validations of the same token yield exactly one success.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use pairlink_core::{PairlinkError, parse_utc, utc_now_string};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::journal::GuardJournal;

/// Persisted record for one approval token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub created_at: String,
    pub expires_at: String,
    pub ttl_seconds: u64,
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<String>,
}

/// Summary of an unused, unexpired token. Only the preview is exposed.
#[derive(Debug, Clone)]
pub struct ActiveToken {
    pub token_preview: String,
    pub created_at: String,
    pub expires_at: String,
    pub ttl_seconds: u64,
}

/// The persisted approval-token store.
pub struct ApprovalStore {
    path: PathBuf,
    journal: GuardJournal,
    lock: Mutex<()>,
}

/// First characters of a token, safe to journal.
fn preview(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{head}...")
}

impl ApprovalStore {
    pub fn new(path: impl Into<PathBuf>, journal: GuardJournal) -> Self {
        Self {
            path: path.into(),
            journal,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Generate a fresh approval token with the given lifetime.
    pub fn generate(&self, ttl: Duration) -> Result<String, PairlinkError> {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let expires_at = (now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(300)))
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let record = TokenRecord {
            created_at: utc_now_string(),
            expires_at: expires_at.clone(),
            ttl_seconds: ttl.as_secs(),
            used: false,
            used_at: None,
        };

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut tokens = self.load();
        tokens.insert(token.clone(), record);
        self.save(&tokens)?;

        self.journal.append(
            "token_generated",
            json!({
                "token_preview": preview(&token),
                "ttl_seconds": ttl.as_secs(),
                "expires_at": expires_at,
            }),
        )?;

        Ok(token)
    }

    /// Validate and consume an approval token.
    ///
    /// `false` when the token is absent, already used, or expired. On
    /// success the token is marked used before `true` is returned; if the
    /// mark cannot be persisted the validation fails closed.
    pub fn validate(&self, token: &str) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut tokens = self.load();

        let Some(record) = tokens.get(token).cloned() else {
            self.journal_outcome("token_invalid", token, json!({"reason": "not_found"}));
            return false;
        };

        if record.used {
            self.journal_outcome(
                "token_invalid",
                token,
                json!({"reason": "already_used", "used_at": record.used_at}),
            );
            return false;
        }

        let expired = match parse_utc(&record.expires_at) {
            Some(expires) => Utc::now() > expires,
            None => true,
        };
        if expired {
            self.journal_outcome(
                "token_invalid",
                token,
                json!({"reason": "expired", "expired_at": record.expires_at}),
            );
            return false;
        }

        let used_at = utc_now_string();
        if let Some(stored) = tokens.get_mut(token) {
            stored.used = true;
            stored.used_at = Some(used_at.clone());
        }
        if let Err(e) = self.save(&tokens) {
            warn!(error = %e, "failed to persist token consumption, failing closed");
            return false;
        }

        self.journal_outcome(
            "token_validated",
            token,
            json!({"created_at": record.created_at, "used_at": used_at}),
        );
        true
    }

    /// Remove expired records. Returns how many were purged.
    pub fn cleanup_expired(&self) -> Result<usize, PairlinkError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut tokens = self.load();
        let now = Utc::now();

        let before = tokens.len();
        tokens.retain(|_, record| match parse_utc(&record.expires_at) {
            Some(expires) => now <= expires,
            None => false,
        });
        let purged = before - tokens.len();

        if purged > 0 {
            self.save(&tokens)?;
            self.journal.append("tokens_cleaned", json!({"count": purged}))?;
        }
        Ok(purged)
    }

    /// Unused, unexpired tokens, as previews.
    pub fn list_active(&self) -> Vec<ActiveToken> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let tokens = self.load();
        let now = Utc::now();

        tokens
            .iter()
            .filter(|(_, record)| {
                !record.used
                    && parse_utc(&record.expires_at).map(|e| now <= e).unwrap_or(false)
            })
            .map(|(token, record)| ActiveToken {
                token_preview: preview(token),
                created_at: record.created_at.clone(),
                expires_at: record.expires_at.clone(),
                ttl_seconds: record.ttl_seconds,
            })
            .collect()
    }

    fn journal_outcome(&self, action: &str, token: &str, mut details: serde_json::Value) {
        if let Some(map) = details.as_object_mut() {
            map.insert("token_preview".to_string(), json!(preview(token)));
        }
        if let Err(e) = self.journal.append(action, details) {
            warn!(error = %e, "guard journal append failed");
        }
    }

    /// Load the token map. A missing or corrupted file reads as empty.
    fn load(&self) -> HashMap<String, TokenRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                debug!(error = %e, "token store unparseable, starting fresh");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    /// Persist the token map with owner-only permissions.
    fn save(&self, tokens: &HashMap<String, TokenRecord>) -> Result<(), PairlinkError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PairlinkError::Guard(format!("token store directory: {e}")))?;
        }

        let contents = serde_json::to_string_pretty(tokens)
            .map_err(|e| PairlinkError::Guard(format!("token store serialization: {e}")))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| PairlinkError::Guard(format!("token store write: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| PairlinkError::Guard(format!("token store permissions: {e}")))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ApprovalStore {
        let journal = GuardJournal::new(dir.path().join("guard_audit.jsonl"));
        ApprovalStore::new(dir.path().join("approvals.json"), journal)
    }

    #[test]
    fn fresh_token_validates_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let token = store.generate(Duration::from_secs(300)).unwrap();
        assert!(store.validate(&token));
        assert!(!store.validate(&token), "second validation must fail");
    }

    #[test]
    fn unknown_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.validate("no-such-token"));
    }

    #[test]
    fn expired_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let token = store.generate(Duration::from_secs(0)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(!store.validate(&token));
    }

    #[test]
    fn cleanup_purges_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let _dead = store.generate(Duration::from_secs(0)).unwrap();
        let live = store.generate(Duration::from_secs(300)).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.cleanup_expired().unwrap(), 1);
        assert!(store.validate(&live), "live token survives cleanup");
    }

    #[test]
    fn list_active_excludes_used_and_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let used = store.generate(Duration::from_secs(300)).unwrap();
        let _expired = store.generate(Duration::from_secs(0)).unwrap();
        let fresh = store.generate(Duration::from_secs(300)).unwrap();
        store.validate(&used);
        std::thread::sleep(Duration::from_millis(20));

        let active = store.list_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token_preview, format!("{}...", &fresh[..10]));
    }

    #[test]
    fn journal_records_every_outcome_with_previews_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let token = store.generate(Duration::from_secs(300)).unwrap();
        store.validate(&token);
        store.validate(&token);
        store.validate("missing");

        let journal = std::fs::read_to_string(dir.path().join("guard_audit.jsonl")).unwrap();
        let actions: Vec<String> = journal
            .lines()
            .map(|l| {
                serde_json::from_str::<serde_json::Value>(l).unwrap()["action"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            actions,
            vec!["token_generated", "token_validated", "token_invalid", "token_invalid"]
        );
        assert!(
            !journal.contains(&token),
            "full token value must never reach the journal"
        );
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.generate(Duration::from_secs(300)).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let token = {
            let store = store_in(&dir);
            store.generate(Duration::from_secs(300)).unwrap()
        };

        let store = store_in(&dir);
        assert!(store.validate(&token), "tokens persist across store handles");
    }

    #[test]
    fn corrupted_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("approvals.json"), "{not json").unwrap();
        let store = store_in(&dir);
        assert!(!store.validate("anything"));
        // And the store recovers on the next write.
        let token = store.generate(Duration::from_secs(300)).unwrap();
        assert!(store.validate(&token));
    }
}
