// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The companion's SQLite persistence backend.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use amiko_config::StorageConfig;
use amiko_core::types::{
    ChatTurn, DailyJournal, MonthlyJournal, ProfilePatch, TurnRole, TurnSummary, UserProfile,
    WeeklyJournal,
};
use amiko_core::{AdapterType, AmikoError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// Everything the companion remembers, on one SQLite file.
///
/// Holds a lazily opened [`Database`] and forwards each trait method to the
/// matching function in [`queries`]. Profile rows, the turn ledger, and all
/// three journal tiers live in the same database.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Builds the adapter without touching the filesystem; the database file
    /// is only created by [`StorageAdapter::initialize`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The open database, or an error when initialize() has not run.
    fn db(&self) -> Result<&Database, AmikoError> {
        self.db.get().ok_or_else(|| AmikoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AmikoError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AmikoError> {
        // Shutdown delegates to a checkpoint if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AmikoError> {
        let db = Database::open(&self.config.database_path).await?;
        if !self.config.wal_mode {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
        }
        self.db.set(db).map_err(|_| AmikoError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AmikoError> {
        let db = self.db()?;
        // Checkpoint WAL; the connection itself closes on drop.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- profiles ---

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AmikoError> {
        queries::profiles::get_profile(self.db()?, user_id).await
    }

    async fn create_profile(&self, user_id: &str) -> Result<UserProfile, AmikoError> {
        queries::profiles::create_profile(self.db()?, user_id).await
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, AmikoError> {
        queries::profiles::list_profiles(self.db()?).await
    }

    async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<(), AmikoError> {
        queries::profiles::update_profile(self.db()?, user_id, patch).await
    }

    async fn add_interests(&self, user_id: &str, interests: &[String]) -> Result<(), AmikoError> {
        queries::profiles::add_interests(self.db()?, user_id, interests).await
    }

    async fn remove_interest(&self, user_id: &str, interest: &str) -> Result<(), AmikoError> {
        queries::profiles::remove_interest(self.db()?, user_id, interest).await
    }

    async fn add_about_facts(&self, user_id: &str, facts: &[String]) -> Result<(), AmikoError> {
        queries::profiles::add_about_facts(self.db()?, user_id, facts).await
    }

    async fn claim_waiting_for_reply(&self, user_id: &str) -> Result<bool, AmikoError> {
        queries::profiles::claim_waiting_for_reply(self.db()?, user_id).await
    }

    // --- history ledger ---

    async fn append_turn(
        &self,
        user_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<(), AmikoError> {
        queries::history::append_turn(self.db()?, user_id, role, text).await
    }

    async fn recent_turns(&self, user_id: &str, limit: u32) -> Result<Vec<ChatTurn>, AmikoError> {
        queries::history::recent_turns(self.db()?, user_id, limit).await
    }

    // --- turn summaries ---

    async fn insert_turn_summary(&self, user_id: &str, text: &str) -> Result<(), AmikoError> {
        queries::summaries::insert_turn_summary(self.db()?, user_id, text).await
    }

    async fn summaries_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<TurnSummary>, AmikoError> {
        queries::summaries::summaries_since(self.db()?, user_id, cutoff).await
    }

    async fn delete_turn_summaries(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<usize, AmikoError> {
        queries::summaries::delete_turn_summaries(self.db()?, user_id, ids).await
    }

    // --- journals ---

    async fn upsert_daily_journal(
        &self,
        user_id: &str,
        day_key: &str,
        text: &str,
    ) -> Result<(), AmikoError> {
        queries::journals::upsert_daily_journal(self.db()?, user_id, day_key, text).await
    }

    async fn daily_journals_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<DailyJournal>, AmikoError> {
        queries::journals::daily_journals_since(self.db()?, user_id, cutoff).await
    }

    async fn list_daily_journals(&self, user_id: &str) -> Result<Vec<DailyJournal>, AmikoError> {
        queries::journals::list_daily_journals(self.db()?, user_id).await
    }

    async fn delete_daily_journals(
        &self,
        user_id: &str,
        day_keys: &[String],
    ) -> Result<usize, AmikoError> {
        queries::journals::delete_daily_journals(self.db()?, user_id, day_keys).await
    }

    async fn upsert_weekly_journal(
        &self,
        user_id: &str,
        week_key: &str,
        text: &str,
        source_daily_keys: &[String],
    ) -> Result<(), AmikoError> {
        queries::journals::upsert_weekly_journal(self.db()?, user_id, week_key, text, source_daily_keys)
            .await
    }

    async fn weekly_journals_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<WeeklyJournal>, AmikoError> {
        queries::journals::weekly_journals_since(self.db()?, user_id, cutoff).await
    }

    async fn list_weekly_journals(&self, user_id: &str) -> Result<Vec<WeeklyJournal>, AmikoError> {
        queries::journals::list_weekly_journals(self.db()?, user_id).await
    }

    async fn delete_weekly_journals(
        &self,
        user_id: &str,
        week_keys: &[String],
    ) -> Result<usize, AmikoError> {
        queries::journals::delete_weekly_journals(self.db()?, user_id, week_keys).await
    }

    async fn upsert_monthly_journal(
        &self,
        user_id: &str,
        month_key: &str,
        text: &str,
        source_weekly_keys: &[String],
    ) -> Result<(), AmikoError> {
        queries::journals::upsert_monthly_journal(
            self.db()?,
            user_id,
            month_key,
            text,
            source_weekly_keys,
        )
        .await
    }

    async fn list_monthly_journals(
        &self,
        user_id: &str,
    ) -> Result<Vec<MonthlyJournal>, AmikoError> {
        queries::journals::list_monthly_journals(self.db()?, user_id).await
    }
}
