// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat history ledger: append-with-prune and bounded reads.

use amiko_core::types::HISTORY_LEDGER_CAP;
use amiko_core::{AmikoError, TurnRole};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::Database;
use crate::models::ChatTurn;

fn turn_from_row(row: &rusqlite::Row<'_>) -> Result<ChatTurn, rusqlite::Error> {
    let role_text: String = row.get(2)?;
    let role = role_text
        .parse::<TurnRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(ChatTurn {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a turn to the user's ledger and prune everything older than the
/// newest [`HISTORY_LEDGER_CAP`] turns.
pub async fn append_turn(
    db: &Database,
    user_id: &str,
    role: TurnRole,
    text: &str,
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let role = role.to_string();
    let text = text.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO history (id, user_id, role, text)
                 VALUES (lower(hex(randomblob(16))), ?1, ?2, ?3)",
                params![user_id, role, text],
            )?;
            // rowid breaks ties between turns sharing a timestamp.
            tx.execute(
                "DELETE FROM history WHERE user_id = ?1 AND rowid NOT IN (
                     SELECT rowid FROM history WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT ?2
                 )",
                params![user_id, HISTORY_LEDGER_CAP as i64],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Up to `limit` most recent turns, oldest first.
pub async fn recent_turns(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<ChatTurn>, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, text, created_at FROM history
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], turn_from_row)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::profiles::create_profile;
    use tempfile::tempdir;

    async fn setup_user() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).await.unwrap();
        create_profile(&db, "u1").await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn append_and_read_chronological() {
        let (db, _dir) = setup_user().await;

        append_turn(&db, "u1", TurnRole::User, "hello").await.unwrap();
        append_turn(&db, "u1", TurnRole::Model, "hi there")
            .await
            .unwrap();
        append_turn(&db, "u1", TurnRole::User, "how are you")
            .await
            .unwrap();

        let turns = recent_turns(&db, "u1", 10).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Model);
        assert_eq!(turns[2].text, "how are you");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn limit_returns_newest_turns() {
        let (db, _dir) = setup_user().await;
        for i in 0..5 {
            append_turn(&db, "u1", TurnRole::User, &format!("turn-{i}"))
                .await
                .unwrap();
        }

        let turns = recent_turns(&db, "u1", 2).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "turn-3");
        assert_eq!(turns[1].text, "turn-4");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ledger_pruned_to_cap() {
        let (db, _dir) = setup_user().await;
        for i in 0..(HISTORY_LEDGER_CAP + 5) {
            append_turn(&db, "u1", TurnRole::User, &format!("turn-{i}"))
                .await
                .unwrap();
        }

        let turns = recent_turns(&db, "u1", 100).await.unwrap();
        assert_eq!(turns.len(), HISTORY_LEDGER_CAP);
        // The oldest five were dropped.
        assert_eq!(turns[0].text, "turn-5");
        assert_eq!(
            turns.last().unwrap().text,
            format!("turn-{}", HISTORY_LEDGER_CAP + 4)
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ledgers_are_isolated_per_user() {
        let (db, _dir) = setup_user().await;
        create_profile(&db, "u2").await.unwrap();

        append_turn(&db, "u1", TurnRole::User, "for u1").await.unwrap();
        append_turn(&db, "u2", TurnRole::User, "for u2").await.unwrap();

        let u1 = recent_turns(&db, "u1", 10).await.unwrap();
        let u2 = recent_turns(&db, "u2", 10).await.unwrap();
        assert_eq!(u1.len(), 1);
        assert_eq!(u2.len(), 1);
        assert_eq!(u1[0].text, "for u1");
        assert_eq!(u2[0].text, "for u2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_ledger_reads_empty() {
        let (db, _dir) = setup_user().await;
        let turns = recent_turns(&db, "u1", 10).await.unwrap();
        assert!(turns.is_empty());
        db.close().await.unwrap();
    }
}
