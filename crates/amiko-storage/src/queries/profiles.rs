// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile CRUD and the waiting-for-reply claim.

use amiko_core::types::ABOUT_MAX_ENTRIES;
use amiko_core::{AmikoError, OnboardingStep};
use rusqlite::types::Type;
use rusqlite::{params, ToSql};

use crate::database::Database;
use crate::models::{ProfilePatch, UserProfile};

const PROFILE_COLUMNS: &str = "user_id, chat_id, onboarding_complete, authorized, \
     pending_question, waiting_for_reply, timezone, active_hours_start, active_hours_end, \
     interests, about, current_sentiment, display_name, last_news_sent_at, \
     last_followup_sent_at, created_at, updated_at";

fn profile_from_row(row: &rusqlite::Row<'_>) -> Result<UserProfile, rusqlite::Error> {
    let pending: Option<String> = row.get(4)?;
    let pending_question = pending
        .map(|s| {
            s.parse::<OnboardingStep>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    let interests_json: String = row.get(9)?;
    let interests: Vec<String> = serde_json::from_str(&interests_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;
    let about_json: String = row.get(10)?;
    let about: Vec<String> = serde_json::from_str(&about_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(UserProfile {
        user_id: row.get(0)?,
        chat_id: row.get(1)?,
        onboarding_complete: row.get(2)?,
        authorized: row.get(3)?,
        pending_question,
        waiting_for_reply: row.get(5)?,
        timezone: row.get(6)?,
        active_hours_start: row.get(7)?,
        active_hours_end: row.get(8)?,
        interests,
        about,
        current_sentiment: row.get(11)?,
        display_name: row.get(12)?,
        last_news_sent_at: row.get(13)?,
        last_followup_sent_at: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn json_encode_err(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

/// Insert a blank profile for a first-time sender and return it.
///
/// Every column other than `user_id` takes its schema default, timestamps
/// included. Fails if a profile already exists for the user.
pub async fn create_profile(db: &Database, user_id: &str) -> Result<UserProfile, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO profiles (user_id) VALUES (?1)",
                params![user_id],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"
            ))?;
            stmt.query_row(params![user_id], profile_from_row)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a profile by user id.
pub async fn get_profile(db: &Database, user_id: &str) -> Result<Option<UserProfile>, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"
            ))?;
            let result = stmt.query_row(params![user_id], profile_from_row);
            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List every profile, oldest first.
pub async fn list_profiles(db: &Database) -> Result<Vec<UserProfile>, AmikoError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at ASC, user_id ASC"
            ))?;
            let rows = stmt.query_map([], profile_from_row)?;
            let mut profiles = Vec::new();
            for row in rows {
                profiles.push(row?);
            }
            Ok(profiles)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update. Untouched fields keep their stored values;
/// `updated_at` is always stamped with the server clock.
pub async fn update_profile(
    db: &Database,
    user_id: &str,
    patch: ProfilePatch,
) -> Result<(), AmikoError> {
    if patch.is_empty() {
        return Ok(());
    }
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            let mut bind = |sets: &mut Vec<String>,
                            values: &mut Vec<Box<dyn ToSql>>,
                            column: &str,
                            value: Box<dyn ToSql>| {
                values.push(value);
                sets.push(format!("{column} = ?{}", values.len()));
            };

            if let Some(chat_id) = patch.chat_id {
                bind(&mut sets, &mut values, "chat_id", Box::new(chat_id));
            }
            if let Some(complete) = patch.onboarding_complete {
                bind(
                    &mut sets,
                    &mut values,
                    "onboarding_complete",
                    Box::new(complete),
                );
            }
            if let Some(authorized) = patch.authorized {
                bind(&mut sets, &mut values, "authorized", Box::new(authorized));
            }
            if let Some(pending) = patch.pending_question {
                bind(
                    &mut sets,
                    &mut values,
                    "pending_question",
                    Box::new(pending.map(|q| q.to_string())),
                );
            }
            if let Some(waiting) = patch.waiting_for_reply {
                bind(
                    &mut sets,
                    &mut values,
                    "waiting_for_reply",
                    Box::new(waiting),
                );
            }
            if let Some(timezone) = patch.timezone {
                bind(&mut sets, &mut values, "timezone", Box::new(timezone));
            }
            if let Some(start) = patch.active_hours_start {
                bind(
                    &mut sets,
                    &mut values,
                    "active_hours_start",
                    Box::new(start),
                );
            }
            if let Some(end) = patch.active_hours_end {
                bind(&mut sets, &mut values, "active_hours_end", Box::new(end));
            }
            if let Some(sentiment) = patch.current_sentiment {
                bind(
                    &mut sets,
                    &mut values,
                    "current_sentiment",
                    Box::new(sentiment),
                );
            }
            if let Some(name) = patch.display_name {
                bind(&mut sets, &mut values, "display_name", Box::new(name));
            }
            if patch.stamp_last_news {
                sets.push(
                    "last_news_sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')".to_string(),
                );
            }
            if patch.stamp_last_followup {
                sets.push(
                    "last_followup_sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')".to_string(),
                );
            }
            sets.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')".to_string());

            values.push(Box::new(user_id));
            let sql = format!(
                "UPDATE profiles SET {} WHERE user_id = ?{}",
                sets.join(", "),
                values.len()
            );
            let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            conn.execute(&sql, &param_refs[..])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Union new interest topics into the profile, preserving insertion order.
pub async fn add_interests(
    db: &Database,
    user_id: &str,
    items: &[String],
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let items = items.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: String = tx.query_row(
                "SELECT interests FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            let mut list: Vec<String> = serde_json::from_str(&current).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?;
            for item in items {
                if !list.contains(&item) {
                    list.push(item);
                }
            }
            let json = serde_json::to_string(&list).map_err(json_encode_err)?;
            tx.execute(
                "UPDATE profiles SET interests = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE user_id = ?2",
                params![json, user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a single interest topic, if present.
pub async fn remove_interest(db: &Database, user_id: &str, item: &str) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let item = item.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: String = tx.query_row(
                "SELECT interests FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            let mut list: Vec<String> = serde_json::from_str(&current).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?;
            list.retain(|existing| existing != &item);
            let json = serde_json::to_string(&list).map_err(json_encode_err)?;
            tx.execute(
                "UPDATE profiles SET interests = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE user_id = ?2",
                params![json, user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Union new personal facts into the profile, newest-last, keeping at most
/// [`ABOUT_MAX_ENTRIES`] entries by dropping the oldest.
pub async fn add_about_facts(
    db: &Database,
    user_id: &str,
    items: &[String],
) -> Result<(), AmikoError> {
    let user_id = user_id.to_string();
    let items = items.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: String = tx.query_row(
                "SELECT about FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            let mut list: Vec<String> = serde_json::from_str(&current).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?;
            for item in items {
                if !list.contains(&item) {
                    list.push(item);
                }
            }
            if list.len() > ABOUT_MAX_ENTRIES {
                let drop = list.len() - ABOUT_MAX_ENTRIES;
                list.drain(..drop);
            }
            let json = serde_json::to_string(&list).map_err(json_encode_err)?;
            tx.execute(
                "UPDATE profiles SET about = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE user_id = ?2",
                params![json, user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically set `waiting_for_reply` if it is currently clear.
///
/// Returns true when this caller won the claim. A false return means the
/// flag was already set and the caller must not send.
pub async fn claim_waiting_for_reply(db: &Database, user_id: &str) -> Result<bool, AmikoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE profiles SET waiting_for_reply = 1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?1 AND waiting_for_reply = 0",
                params![user_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_returns_blank_profile() {
        let (db, _dir) = setup_db().await;
        let profile = create_profile(&db, "u1").await.unwrap();

        assert_eq!(profile.user_id, "u1");
        assert!(profile.chat_id.is_none());
        assert!(!profile.onboarding_complete);
        assert!(!profile.authorized);
        assert!(profile.pending_question.is_none());
        assert!(!profile.waiting_for_reply);
        assert!(profile.interests.is_empty());
        assert!(profile.about.is_empty());
        assert!(!profile.created_at.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_profile_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_profile(&db, "nobody").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_duplicate_fails() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "dup").await.unwrap();
        assert!(create_profile(&db, "dup").await.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn patch_updates_only_named_fields() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u2").await.unwrap();
        update_profile(
            &db,
            "u2",
            ProfilePatch {
                chat_id: Some("chat-42".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let patch = ProfilePatch {
            timezone: Some("Asia/Kolkata".to_string()),
            active_hours_start: Some(9),
            pending_question: Some(Some(OnboardingStep::ActiveHoursEnd)),
            ..Default::default()
        };
        update_profile(&db, "u2", patch).await.unwrap();

        let loaded = get_profile(&db, "u2").await.unwrap().unwrap();
        assert_eq!(loaded.timezone.as_deref(), Some("Asia/Kolkata"));
        assert_eq!(loaded.active_hours_start, Some(9));
        assert_eq!(
            loaded.pending_question,
            Some(OnboardingStep::ActiveHoursEnd)
        );
        // Untouched fields keep their values.
        assert_eq!(loaded.chat_id.as_deref(), Some("chat-42"));
        assert!(!loaded.onboarding_complete);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn patch_clears_pending_question() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u3").await.unwrap();
        update_profile(
            &db,
            "u3",
            ProfilePatch {
                pending_question: Some(Some(OnboardingStep::Name)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let patch = ProfilePatch {
            pending_question: Some(None),
            onboarding_complete: Some(true),
            ..Default::default()
        };
        update_profile(&db, "u3", patch).await.unwrap();

        let loaded = get_profile(&db, "u3").await.unwrap().unwrap();
        assert!(loaded.pending_question.is_none());
        assert!(loaded.onboarding_complete);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op() {
        let (db, _dir) = setup_db().await;
        let created = create_profile(&db, "u4").await.unwrap();
        update_profile(&db, "u4", ProfilePatch::default())
            .await
            .unwrap();
        let loaded = get_profile(&db, "u4").await.unwrap().unwrap();
        assert_eq!(loaded.updated_at, created.updated_at);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stamp_last_news_sets_timestamp() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u5").await.unwrap();

        let patch = ProfilePatch {
            stamp_last_news: true,
            ..Default::default()
        };
        update_profile(&db, "u5", patch).await.unwrap();

        let loaded = get_profile(&db, "u5").await.unwrap().unwrap();
        assert!(loaded.last_news_sent_at.is_some());
        assert!(loaded.last_followup_sent_at.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn interests_union_and_remove() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u6").await.unwrap();

        add_interests(&db, "u6", &["space".to_string(), "jazz".to_string()])
            .await
            .unwrap();
        // Duplicate is not added twice.
        add_interests(&db, "u6", &["space".to_string(), "hiking".to_string()])
            .await
            .unwrap();

        let loaded = get_profile(&db, "u6").await.unwrap().unwrap();
        assert_eq!(loaded.interests, vec!["space", "jazz", "hiking"]);

        remove_interest(&db, "u6", "jazz").await.unwrap();
        let loaded = get_profile(&db, "u6").await.unwrap().unwrap();
        assert_eq!(loaded.interests, vec!["space", "hiking"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn about_facts_capped_to_newest() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u7").await.unwrap();

        let facts: Vec<String> = (0..12).map(|i| format!("fact-{i}")).collect();
        add_about_facts(&db, "u7", &facts).await.unwrap();

        let loaded = get_profile(&db, "u7").await.unwrap().unwrap();
        assert_eq!(loaded.about.len(), ABOUT_MAX_ENTRIES);
        assert_eq!(loaded.about.first().map(String::as_str), Some("fact-2"));
        assert_eq!(loaded.about.last().map(String::as_str), Some("fact-11"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_waiting_for_reply_is_exclusive() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "u8").await.unwrap();

        assert!(claim_waiting_for_reply(&db, "u8").await.unwrap());
        // Second claim loses until the flag is cleared.
        assert!(!claim_waiting_for_reply(&db, "u8").await.unwrap());

        let patch = ProfilePatch {
            waiting_for_reply: Some(false),
            ..Default::default()
        };
        update_profile(&db, "u8", patch).await.unwrap();
        assert!(claim_waiting_for_reply(&db, "u8").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_on_missing_user_changes_nothing() {
        let (db, _dir) = setup_db().await;
        assert!(!claim_waiting_for_reply(&db, "ghost").await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_profiles_returns_all() {
        let (db, _dir) = setup_db().await;
        create_profile(&db, "a").await.unwrap();
        create_profile(&db, "b").await.unwrap();
        let all = list_profiles(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        db.close().await.unwrap();
    }
}
