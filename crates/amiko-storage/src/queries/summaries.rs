// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn summary staging for the daily rollup.

use amiko_core::AmikoError;
use rusqlite::params;
use rusqlite::ToSql;

use crate::database::Database;
use crate::models::TurnSummary;

fn summary_from_row(row: &rusqlite::Row<'_>) -> Result<TurnSummary, rusqlite::Error> {
    Ok(TurnSummary {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Stage a per-turn summary for later consolidation.
pub async fn insert_turn_summary(
    db: &Database,
    user_id: &str,
    text: &str,
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let text = text.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO turn_summaries (id, user_id, text)
                 VALUES (lower(hex(randomblob(16))), ?1, ?2)",
                params![user_id, text],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Summaries created at or after `cutoff`, oldest first.
pub async fn summaries_since(
    db: &Database,
    user_id: &str,
    cutoff: &str,
) -> Result<Vec<TurnSummary>, AmikoError> {
    let user_id = user_id.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, text, created_at FROM turn_summaries
                 WHERE user_id = ?1 AND created_at >= ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![user_id, cutoff], summary_from_row)?;
            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row?);
            }
            Ok(summaries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete the given summaries by id. Absent ids are ignored; returns the
/// number of rows actually removed.
pub async fn delete_turn_summaries(
    db: &Database,
    user_id: &str,
    ids: &[String],
) -> Result<usize, AmikoError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let user_id = user_id.to_string();
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = (0..ids.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "DELETE FROM turn_summaries WHERE user_id = ?1 AND id IN ({placeholders})"
            );
            let mut values: Vec<&dyn ToSql> = vec![&user_id];
            for id in &ids {
                values.push(id);
            }
            let deleted = conn.execute(&sql, &values[..])?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
