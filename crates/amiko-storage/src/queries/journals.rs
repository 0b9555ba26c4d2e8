// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily, weekly, and monthly journal tiers.
//!
//! Upserts are idempotent on (user_id, key) so a re-run rollup replaces its
//! own output instead of duplicating it. The `*_since` reads filter on the
//! row's own creation time, not the key, because keys of the higher tiers
//! do not sort chronologically.

use amiko_core::AmikoError;
use rusqlite::params;
use rusqlite::types::Type;
use rusqlite::ToSql;

use crate::database::Database;
use crate::models::{DailyJournal, MonthlyJournal, WeeklyJournal};

fn decode_keys(idx: usize, json: String) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(&json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn encode_keys(keys: &[String]) -> Result<String, rusqlite::Error> {
    serde_json::to_string(keys).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn daily_from_row(row: &rusqlite::Row<'_>) -> Result<DailyJournal, rusqlite::Error> {
    Ok(DailyJournal {
        user_id: row.get(0)?,
        day_key: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn weekly_from_row(row: &rusqlite::Row<'_>) -> Result<WeeklyJournal, rusqlite::Error> {
    Ok(WeeklyJournal {
        user_id: row.get(0)?,
        week_key: row.get(1)?,
        text: row.get(2)?,
        source_daily_keys: decode_keys(3, row.get(3)?)?,
        created_at: row.get(4)?,
    })
}

fn monthly_from_row(row: &rusqlite::Row<'_>) -> Result<MonthlyJournal, rusqlite::Error> {
    Ok(MonthlyJournal {
        user_id: row.get(0)?,
        month_key: row.get(1)?,
        text: row.get(2)?,
        source_weekly_keys: decode_keys(3, row.get(3)?)?,
        created_at: row.get(4)?,
    })
}

async fn delete_by_keys(
    db: &Database,
    table: &'static str,
    key_column: &'static str,
    user_id: &str,
    keys: &[String],
) -> Result<usize, AmikoError> {
    if keys.is_empty() {
        return Ok(0);
    }
    let user_id = user_id.to_string();
    let keys = keys.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = (0..keys.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "DELETE FROM {table} WHERE user_id = ?1 AND {key_column} IN ({placeholders})"
            );
            let mut values: Vec<&dyn ToSql> = vec![&user_id];
            for key in &keys {
                values.push(key);
            }
            let deleted = conn.execute(&sql, &values[..])?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// --- daily ---

/// Write or replace the journal for one calendar day.
pub async fn upsert_daily_journal(
    db: &Database,
    user_id: &str,
    day_key: &str,
    text: &str,
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let day_key = day_key.to_string();
    let text = text.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO daily_journals (user_id, day_key, text) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, day_key) DO UPDATE SET
                     text = excluded.text,
                     created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, day_key, text],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Daily journals created at or after `cutoff`, oldest day first.
pub async fn daily_journals_since(
    db: &Database,
    user_id: &str,
    cutoff: &str,
) -> Result<Vec<DailyJournal>, AmikoError> {
    let user_id = user_id.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, day_key, text, created_at FROM daily_journals
                 WHERE user_id = ?1 AND created_at >= ?2 ORDER BY day_key ASC",
            )?;
            let rows = stmt.query_map(params![user_id, cutoff], daily_from_row)?;
            let mut journals = Vec::new();
            for row in rows {
                journals.push(row?);
            }
            Ok(journals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every daily journal for the user, oldest day first.
pub async fn list_daily_journals(
    db: &Database,
    user_id: &str,
) -> Result<Vec<DailyJournal>, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, day_key, text, created_at FROM daily_journals
                 WHERE user_id = ?1 ORDER BY day_key ASC",
            )?;
            let rows = stmt.query_map(params![user_id], daily_from_row)?;
            let mut journals = Vec::new();
            for row in rows {
                journals.push(row?);
            }
            Ok(journals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete daily journals by day key. Returns the number removed.
pub async fn delete_daily_journals(
    db: &Database,
    user_id: &str,
    day_keys: &[String],
) -> Result<usize, AmikoError> {
    delete_by_keys(db, "daily_journals", "day_key", user_id, day_keys).await
}

// --- weekly ---

/// Write or replace the journal for one week bucket, recording which daily
/// journals it was built from.
pub async fn upsert_weekly_journal(
    db: &Database,
    user_id: &str,
    week_key: &str,
    text: &str,
    source_daily_keys: &[String],
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let week_key = week_key.to_string();
    let text = text.to_string();
    let source_daily_keys = source_daily_keys.to_vec();
    db.connection()
        .call(move |conn| {
            let sources = encode_keys(&source_daily_keys)?;
            conn.execute(
                "INSERT INTO weekly_journals (user_id, week_key, text, source_daily_keys)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, week_key) DO UPDATE SET
                     text = excluded.text,
                     source_daily_keys = excluded.source_daily_keys,
                     created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, week_key, text, sources],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Weekly journals created at or after `cutoff`, oldest first.
pub async fn weekly_journals_since(
    db: &Database,
    user_id: &str,
    cutoff: &str,
) -> Result<Vec<WeeklyJournal>, AmikoError> {
    let user_id = user_id.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, week_key, text, source_daily_keys, created_at
                 FROM weekly_journals
                 WHERE user_id = ?1 AND created_at >= ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![user_id, cutoff], weekly_from_row)?;
            let mut journals = Vec::new();
            for row in rows {
                journals.push(row?);
            }
            Ok(journals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every weekly journal for the user, oldest first.
pub async fn list_weekly_journals(
    db: &Database,
    user_id: &str,
) -> Result<Vec<WeeklyJournal>, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, week_key, text, source_daily_keys, created_at
                 FROM weekly_journals WHERE user_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![user_id], weekly_from_row)?;
            let mut journals = Vec::new();
            for row in rows {
                journals.push(row?);
            }
            Ok(journals)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete weekly journals by week key. Returns the number removed.
pub async fn delete_weekly_journals(
    db: &Database,
    user_id: &str,
    week_keys: &[String],
) -> Result<usize, AmikoError> {
    delete_by_keys(db, "weekly_journals", "week_key", user_id, week_keys).await
}

// --- monthly ---

/// Write or replace the journal for one calendar month, recording which
/// weekly journals it was built from.
pub async fn upsert_monthly_journal(
    db: &Database,
    user_id: &str,
    month_key: &str,
    text: &str,
    source_weekly_keys: &[String],
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let month_key = month_key.to_string();
    let text = text.to_string();
    let source_weekly_keys = source_weekly_keys.to_vec();
    db.connection()
        .call(move |conn| {
            let sources = encode_keys(&source_weekly_keys)?;
            conn.execute(
                "INSERT INTO monthly_journals (user_id, month_key, text, source_weekly_keys)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, month_key) DO UPDATE SET
                     text = excluded.text,
                     source_weekly_keys = excluded.source_weekly_keys,
                     created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, month_key, text, sources],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every monthly journal for the user, oldest first.
pub async fn list_monthly_journals(
    db: &Database,
    user_id: &str,
) -> Result<Vec<MonthlyJournal>, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, month_key, text, source_weekly_keys, created_at
                 FROM monthly_journals WHERE user_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![user_id], monthly_from_row)?;
            let mut journals = Vec::new();
            for row in rows {
                journals.push(row?);
            }
            Ok(journals)
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
    async fn daily_upsert_replaces_same_key() {
        let (db, _dir) = setup_user().await;

        upsert_daily_journal(&db, "u1", "2026-08-23", "first draft")
            .await
            .unwrap();
        upsert_daily_journal(&db, "u1", "2026-08-23", "rewritten")
            .await
            .unwrap();
        upsert_daily_journal(&db, "u1", "2026-08-24", "next day")
            .await
            .unwrap();

        let all = list_daily_journals(&db, "u1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].day_key, "2026-08-23");
        assert_eq!(all[0].text, "rewritten");
        assert_eq!(all[1].day_key, "2026-08-24");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn daily_since_respects_cutoff() {
        let (db, _dir) = setup_user().await;
        upsert_daily_journal(&db, "u1", "2026-08-20", "entry")
            .await
            .unwrap();

        let recent = daily_journals_since(&db, "u1", "1970-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let none = daily_journals_since(&db, "u1", "2999-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert!(none.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn daily_delete_by_key() {
        let (db, _dir) = setup_user().await;
        upsert_daily_journal(&db, "u1", "2026-08-20", "a").await.unwrap();
        upsert_daily_journal(&db, "u1", "2026-08-21", "b").await.unwrap();

        let deleted = delete_daily_journals(&db, "u1", &["2026-08-20".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = list_daily_journals(&db, "u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].day_key, "2026-08-21");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn weekly_records_source_daily_keys() {
        let (db, _dir) = setup_user().await;
        let sources = vec!["2026-08-18".to_string(), "2026-08-19".to_string()];
        upsert_weekly_journal(&db, "u1", "August-week-3-2026", "that week", &sources)
            .await
            .unwrap();

        let all = list_weekly_journals(&db, "u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].week_key, "August-week-3-2026");
        assert_eq!(all[0].source_daily_keys, sources);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn weekly_upsert_replaces_text_and_sources() {
        let (db, _dir) = setup_user().await;
        upsert_weekly_journal(
            &db,
            "u1",
            "August-week-3-2026",
            "v1",
            &["2026-08-18".to_string()],
        )
        .await
        .unwrap();
        upsert_weekly_journal(
            &db,
            "u1",
            "August-week-3-2026",
            "v2",
            &["2026-08-18".to_string(), "2026-08-19".to_string()],
        )
        .await
        .unwrap();

        let all = list_weekly_journals(&db, "u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "v2");
        assert_eq!(all[0].source_daily_keys.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn weekly_delete_by_key() {
        let (db, _dir) = setup_user().await;
        upsert_weekly_journal(&db, "u1", "August-week-1-2026", "w1", &[])
            .await
            .unwrap();
        upsert_weekly_journal(&db, "u1", "August-week-2-2026", "w2", &[])
            .await
            .unwrap();

        let deleted =
            delete_weekly_journals(&db, "u1", &["August-week-1-2026".to_string()])
                .await
                .unwrap();
        assert_eq!(deleted, 1);

        let remaining = list_weekly_journals(&db, "u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].week_key, "August-week-2-2026");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn monthly_upsert_and_list() {
        let (db, _dir) = setup_user().await;
        upsert_monthly_journal(
            &db,
            "u1",
            "August-2026",
            "the month in review",
            &["August-week-1-2026".to_string(), "August-week-2-2026".to_string()],
        )
        .await
        .unwrap();

        let all = list_monthly_journals(&db, "u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].month_key, "August-2026");
        assert_eq!(all[0].source_weekly_keys.len(), 2);

        // Replacing the same key keeps a single row.
        upsert_monthly_journal(&db, "u1", "August-2026", "revised", &[])
            .await
            .unwrap();
        let all = list_monthly_journals(&db, "u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "revised");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn journals_are_isolated_per_user() {
        let (db, _dir) = setup_user().await;
        create_profile(&db, "u2").await.unwrap();

        upsert_daily_journal(&db, "u1", "2026-08-20", "mine").await.unwrap();
        let other = list_daily_journals(&db, "u2").await.unwrap();
        assert!(other.is_empty());

        db.close().await.unwrap();
    }
}
