// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use pairlink_core::PairlinkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Conversation;

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        session_a_role: row.get(1)?,
        session_b_role: row.get(2)?,
        session_a_token: row.get(3)?,
        session_b_token: row.get(4)?,
        created_at: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

/// Insert a new conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), PairlinkError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                 (id, session_a_role, session_b_role, session_a_token, session_b_token, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    conversation.id,
                    conversation.session_a_role,
                    conversation.session_b_role,
                    conversation.session_a_token,
                    conversation.session_b_token,
                    conversation.created_at,
                    conversation.expires_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, PairlinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_a_role, session_b_role, session_a_token, session_b_token, created_at, expires_at
                 FROM conversations WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete conversations whose expiry is in the past. Cascades to their
/// messages. Returns the number of conversations removed.
pub async fn delete_expired(db: &Database, now: &str) -> Result<usize, PairlinkError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM conversations WHERE expires_at < ?1",
                params![now],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlink_core::{SessionSlot, utc_now_string};

    fn make_conversation(id: &str, expires_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            session_a_role: "backend_developer".to_string(),
            session_b_role: "frontend_developer".to_string(),
            session_a_token: "a".repeat(64),
            session_b_token: "b".repeat(64),
            created_at: utc_now_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let db = Database::open_in_memory().await.unwrap();
        let conv = make_conversation("conv_0123456789abcdef", "2099-01-01T00:00:00.000Z");

        create_conversation(&db, &conv).await.unwrap();
        let got = get_conversation(&db, "conv_0123456789abcdef")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.session_a_role, "backend_developer");
        assert_eq!(got.token_for(SessionSlot::A), conv.session_a_token);
        assert_eq!(got.token_for(SessionSlot::B), conv.session_b_token);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_conversation(&db, "conv_ffffffffffffffff")
            .await
            .unwrap()
            .is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_expiry() {
        let db = Database::open_in_memory().await.unwrap();
        let dead = make_conversation("conv_00000000000000aa", "2000-01-01T00:00:00.000Z");
        let live = make_conversation("conv_00000000000000bb", "2099-01-01T00:00:00.000Z");
        create_conversation(&db, &dead).await.unwrap();
        create_conversation(&db, &live).await.unwrap();

        let removed = delete_expired(&db, &utc_now_string()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(get_conversation(&db, &dead.id).await.unwrap().is_none());
        assert!(get_conversation(&db, &live.id).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[test]
    fn expiry_check_uses_parsed_timestamp() {
        let past = make_conversation("conv_00000000000000cc", "2000-01-01T00:00:00.000Z");
        let future = make_conversation("conv_00000000000000dd", "2099-01-01T00:00:00.000Z");
        let garbled = make_conversation("conv_00000000000000ee", "not-a-timestamp");
        let now = chrono::Utc::now();
        assert!(past.is_expired(now));
        assert!(!future.is_expired(now));
        assert!(garbled.is_expired(now));
    }
}
