// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session status upsert and lookup.

use pairlink_core::PairlinkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::SessionStatusRow;

/// Upsert the status row for (conversation, session).
pub async fn upsert_status(db: &Database, row: &SessionStatusRow) -> Result<(), PairlinkError> {
    let row = row.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_status
                 (conversation_id, session_id, status, last_heartbeat)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.conversation_id, row.session_id, row.status, row.last_heartbeat],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the status row for (conversation, session), if any.
pub async fn get_status(
    db: &Database,
    conversation_id: &str,
    session_id: &str,
) -> Result<Option<SessionStatusRow>, PairlinkError> {
    let conversation_id = conversation_id.to_string();
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, session_id, status, last_heartbeat
                 FROM session_status WHERE conversation_id = ?1 AND session_id = ?2",
            )?;
            let result = stmt.query_row(params![conversation_id, session_id], |row| {
                Ok(SessionStatusRow {
                    conversation_id: row.get(0)?,
                    session_id: row.get(1)?,
                    status: row.get(2)?,
                    last_heartbeat: row.get(3)?,
                })
            });
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
