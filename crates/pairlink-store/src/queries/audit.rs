// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail.

use pairlink_core::{PairlinkError, utc_now_string};
use rusqlite::params;

use crate::database::Database;
use crate::models::AuditEntry;

/// Append one audit record. `details` is serialized to JSON.
pub async fn append_audit(
    db: &Database,
    conversation_id: Option<&str>,
    session_id: Option<&str>,
    action: &str,
    details: serde_json::Value,
) -> Result<(), PairlinkError> {
    let conversation_id = conversation_id.map(str::to_string);
    let session_id = session_id.map(str::to_string);
    let action = action.to_string();
    let details = details.to_string();
    let timestamp = utc_now_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (conversation_id, session_id, action, details, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![conversation_id, session_id, action, details, timestamp],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent audit entries, newest first. Read path for inspection.
pub async fn recent_audit(db: &Database, limit: i64) -> Result<Vec<AuditEntry>, PairlinkError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, session_id, action, details, timestamp
                 FROM audit_log ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    session_id: row.get(2)?,
                    action: row.get(3)?,
                    details: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn appended_entries_come_back_newest_first() {
        let db = Database::open_in_memory().await.unwrap();

        append_audit(
            &db,
            Some("conv_0123456789abcdef"),
            Some("a"),
            "send_message",
            json!({"to": "b", "message_length": 5}),
        )
        .await
        .unwrap();
        append_audit(&db, None, None, "create_conversation", json!({}))
            .await
            .unwrap();

        let entries = recent_audit(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "create_conversation");
        assert_eq!(entries[1].action, "send_message");
        assert_eq!(entries[1].session_id.as_deref(), Some("a"));

        let details: serde_json::Value =
            serde_json::from_str(entries[1].details.as_deref().unwrap()).unwrap();
        assert_eq!(details["message_length"], 5);

        db.close().await.unwrap();
    }
}
