// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the persistence service.

use async_trait::async_trait;

use crate::error::AmikoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChatTurn, DailyJournal, MonthlyJournal, ProfilePatch, TurnRole, TurnSummary, UserProfile,
    WeeklyJournal,
};

/// Adapter for storage and persistence backends.
///
/// Provides the per-user profile record plus its ordered sub-collections
/// (history ledger, turn summaries, three journal tiers). All timestamps are
/// server-assigned; cutoffs are RFC 3339 strings compared lexicographically.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), AmikoError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), AmikoError>;

    // --- profiles ---

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AmikoError>;

    /// Creates a blank profile for a first-time sender. Fails if one exists.
    async fn create_profile(&self, user_id: &str) -> Result<UserProfile, AmikoError>;

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, AmikoError>;

    /// Merge-patches the profile: only fields set in the patch are written.
    async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<(), AmikoError>;

    /// Unions new interests into the interest set, skipping duplicates.
    async fn add_interests(&self, user_id: &str, interests: &[String]) -> Result<(), AmikoError>;

    /// Removes one interest from the set, if present.
    async fn remove_interest(&self, user_id: &str, interest: &str) -> Result<(), AmikoError>;

    /// Unions normalized facts into the `about` list and trims it to the
    /// most-recently-added entries, newest-last.
    async fn add_about_facts(&self, user_id: &str, facts: &[String]) -> Result<(), AmikoError>;

    /// Atomically claims the `waiting_for_reply` flag. Returns true iff the
    /// flag was previously clear and this caller set it; a false return means
    /// another send already holds the claim.
    async fn claim_waiting_for_reply(&self, user_id: &str) -> Result<bool, AmikoError>;

    // --- history ledger ---

    /// Appends a turn and prunes the ledger beyond the retention cap.
    async fn append_turn(
        &self,
        user_id: &str,
        role: TurnRole,
        text: &str,
    ) -> Result<(), AmikoError>;

    /// Returns up to `limit` most recent turns in chronological order.
    async fn recent_turns(&self, user_id: &str, limit: u32) -> Result<Vec<ChatTurn>, AmikoError>;

    // --- turn summaries ---

    async fn insert_turn_summary(&self, user_id: &str, text: &str) -> Result<(), AmikoError>;

    /// Summaries created at or after `cutoff`, oldest first.
    async fn summaries_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<TurnSummary>, AmikoError>;

    /// Deletes the given summaries; absent ids are ignored. Returns the
    /// number actually deleted.
    async fn delete_turn_summaries(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<usize, AmikoError>;

    // --- journals ---

    async fn upsert_daily_journal(
        &self,
        user_id: &str,
        day_key: &str,
        text: &str,
    ) -> Result<(), AmikoError>;

    /// Daily journals created at or after `cutoff`, oldest first.
    async fn daily_journals_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<DailyJournal>, AmikoError>;

    async fn list_daily_journals(&self, user_id: &str) -> Result<Vec<DailyJournal>, AmikoError>;

    async fn delete_daily_journals(
        &self,
        user_id: &str,
        day_keys: &[String],
    ) -> Result<usize, AmikoError>;

    async fn upsert_weekly_journal(
        &self,
        user_id: &str,
        week_key: &str,
        text: &str,
        source_daily_keys: &[String],
    ) -> Result<(), AmikoError>;

    /// Weekly journals created at or after `cutoff`, oldest first.
    async fn weekly_journals_since(
        &self,
        user_id: &str,
        cutoff: &str,
    ) -> Result<Vec<WeeklyJournal>, AmikoError>;

    async fn list_weekly_journals(&self, user_id: &str) -> Result<Vec<WeeklyJournal>, AmikoError>;

    async fn delete_weekly_journals(
        &self,
        user_id: &str,
        week_keys: &[String],
    ) -> Result<usize, AmikoError>;

    async fn upsert_monthly_journal(
        &self,
        user_id: &str,
        month_key: &str,
        text: &str,
        source_weekly_keys: &[String],
    ) -> Result<(), AmikoError>;

    async fn list_monthly_journals(
        &self,
        user_id: &str,
    ) -> Result<Vec<MonthlyJournal>, AmikoError>;
}
