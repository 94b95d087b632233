// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only JSON-lines journal for guard-stage events.
//!
//! Separate from the conversation audit log: guard events (token
//! generation, validation outcomes, enablement attempts) are recorded here
//! even when no conversation exists yet.

use std::io::Write;
use std::path::{Path, PathBuf};

use pairlink_core::{PairlinkError, utc_now_string};
use serde::{Deserialize, Serialize};

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub action: String,
    pub details: serde_json::Value,
}

/// Handle to the guard journal file.
#[derive(Debug, Clone)]
pub struct GuardJournal {
    path: PathBuf,
}

impl GuardJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a JSON line.
    pub fn append(&self, action: &str, details: serde_json::Value) -> Result<(), PairlinkError> {
        let entry = JournalEntry {
            timestamp: utc_now_string(),
            action: action.to_string(),
            details,
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| PairlinkError::Guard(format!("journal serialization failed: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PairlinkError::Guard(format!("journal directory: {e}")))?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PairlinkError::Guard(format!("journal open: {e}")))?;
        writeln!(file, "{line}").map_err(|e| PairlinkError::Guard(format!("journal write: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn appends_parseable_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GuardJournal::new(dir.path().join("guard_audit.jsonl"));

        journal
            .append("token_generated", json!({"token_preview": "abc1234567...", "ttl_seconds": 300}))
            .unwrap();
        journal
            .append("token_invalid", json!({"reason": "expired"}))
            .unwrap();

        let contents = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: JournalEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, "token_generated");
        assert_eq!(first.details["ttl_seconds"], 300);

        let second: JournalEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.details["reason"], "expired");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GuardJournal::new(dir.path().join("nested/guard_audit.jsonl"));
        journal.append("enabled", json!({})).unwrap();
        assert!(journal.path().exists());
    }
}
