// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message insert and the atomic take-unread operation.

use pairlink_core::PairlinkError;
use rusqlite::{TransactionBehavior, params};

use crate::database::Database;
use crate::models::{Message, NewMessage};

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        from_session: row.get(2)?,
        to_session: row.get(3)?,
        body: row.get(4)?,
        metadata: row.get(5)?,
        timestamp: row.get(6)?,
        read: row.get::<_, i64>(7)? != 0,
    })
}

/// Insert a new message; the database assigns the id.
pub async fn insert_message(db: &Database, msg: &NewMessage) -> Result<i64, PairlinkError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                 (conversation_id, from_session, to_session, body, metadata, timestamp, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    msg.conversation_id,
                    msg.from_session,
                    msg.to_session,
                    msg.body,
                    msg.metadata,
                    msg.timestamp,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Select all unread messages addressed to `to_session` and mark them read,
/// in one exclusive transaction. Returns the rows as they were before the
/// mark, ordered by timestamp ascending.
///
/// Concurrent callers for the same (conversation, session) partition the
/// unread set disjointly: a message is returned by at most one call, ever.
pub async fn take_unread(
    db: &Database,
    conversation_id: &str,
    to_session: &str,
) -> Result<Vec<Message>, PairlinkError> {
    let conversation_id = conversation_id.to_string();
    let to_session = to_session.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let messages = {
                let mut stmt = tx.prepare(
                    "SELECT id, conversation_id, from_session, to_session, body, metadata, timestamp, read
                     FROM messages
                     WHERE conversation_id = ?1 AND to_session = ?2 AND read = 0
                     ORDER BY timestamp ASC",
                )?;
                let rows = stmt.query_map(params![conversation_id, to_session], row_to_message)?;
                let mut messages = Vec::new();
                for row in rows {
                    messages.push(row?);
                }
                messages
            };

            for msg in &messages {
                tx.execute("UPDATE messages SET read = 1 WHERE id = ?1", params![msg.id])?;
            }

            tx.commit()?;
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
