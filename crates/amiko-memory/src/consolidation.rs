// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical journal rollups: turns into summaries, summaries into daily
//! journals, daily into weekly, weekly into monthly.
//!
//! Each rollup consumes its sources destructively: write the new journal,
//! then delete what it consumed. A crash between the two steps may duplicate
//! content into a later journal (accepted at-least-once semantics). Per-user
//! failures are isolated: one user's model error never aborts the sweep for
//! the others.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, info, warn};

use amiko_core::types::ProviderRequest;
use amiko_core::{AmikoError, ProviderAdapter, StorageAdapter};

/// Prompt for compressing one turn pair into a 1-2 sentence summary.
const TURN_SUMMARY_PROMPT: &str = "Summarize this short conversation into 1-2 simple sentences \
for a long-term memory. USER said: \"{user}\". YOU replied: \"{model}\"";

/// Prompt for the daily rollup over raw turn summaries.
const DAILY_ROLLUP_PROMPT: &str = "You are a careful journal keeper. Below is a raw list of all \
chat summaries from one user's day. Read them all and combine them into a single, concise \
journal entry. Focus on key events, important facts the user revealed, new interests, and \
anything the user specifically asked to remember. Ignore simple greetings and chatter. Format \
it as a neat journal entry.\n\nRAW CHAT SUMMARIES:\n{sources}";

/// Prompt for the weekly rollup over labeled daily journals.
const WEEKLY_ROLLUP_PROMPT: &str = "You are a careful journal keeper. Below is a list of all \
daily journal entries from one user's week. Read them all and combine them into a single, \
precise weekly summary. This is crucial memory, so be accurate. Organize the summary \
day-by-day (e.g. '2025-10-28: ...'). Focus only on key events, important facts, new interests, \
and items to remember. Ignore chatter. Be concise.\n\nRAW DAILY JOURNALS:\n{sources}";

/// Prompt for the monthly rollup over labeled weekly journals.
const MONTHLY_ROLLUP_PROMPT: &str = "You are a careful journal keeper. Below is a list of all \
weekly journal entries from one user's month. Read them all and combine them into a single, \
precise monthly summary. This is crucial memory, so be accurate. Organize the summary \
week-by-week (e.g. 'Week-1: ...'). Focus only on key events, important facts, new interests, \
and items to remember. Be concise.\n\nRAW WEEKLY JOURNALS:\n{sources}";

/// Outcome counts for one rollup sweep across all users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupReport {
    /// Users for whom a journal was written.
    pub processed: usize,
    /// Users with no source records in the window.
    pub skipped: usize,
    /// Users whose rollup failed; retried on the next sweep.
    pub failed: usize,
}

impl fmt::Display for RollupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, skipped {}, failed {}",
            self.processed, self.skipped, self.failed
        )
    }
}

/// Runs the consolidation pipeline against storage and the model provider.
pub struct Consolidator {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
}

impl Consolidator {
    pub fn new(storage: Arc<dyn StorageAdapter>, provider: Arc<dyn ProviderAdapter>) -> Self {
        Self { storage, provider }
    }

    /// Compress one turn pair into a stored [`TurnSummary`].
    ///
    /// [`TurnSummary`]: amiko_core::types::TurnSummary
    pub async fn summarize_turn(
        &self,
        user_id: &str,
        user_text: &str,
        model_text: &str,
    ) -> Result<(), AmikoError> {
        let prompt = TURN_SUMMARY_PROMPT
            .replace("{user}", user_text)
            .replace("{model}", model_text);

        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;
        self.storage
            .insert_turn_summary(user_id, response.text.trim())
            .await?;

        debug!(user_id, "turn summary saved");
        Ok(())
    }

    /// Consolidate the trailing day of turn summaries into one daily journal
    /// per user, deleting the consumed summaries.
    pub async fn run_daily(&self) -> Result<RollupReport, AmikoError> {
        let cutoff = cutoff_before(Duration::hours(24));
        let day_key = day_key(Utc::now());
        let mut report = RollupReport::default();

        for profile in self.storage.list_profiles().await? {
            match self.daily_rollup_for_user(&profile.user_id, &cutoff, &day_key).await {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(user_id = profile.user_id, error = %e, "daily rollup failed");
                    report.failed += 1;
                }
            }
        }

        info!(%report, "daily rollup sweep complete");
        Ok(report)
    }

    async fn daily_rollup_for_user(
        &self,
        user_id: &str,
        cutoff: &str,
        day_key: &str,
    ) -> Result<bool, AmikoError> {
        let summaries = self.storage.summaries_since(user_id, cutoff).await?;
        if summaries.is_empty() {
            return Ok(false);
        }

        let sources = summaries
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = DAILY_ROLLUP_PROMPT.replace("{sources}", &sources);
        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;

        self.storage
            .upsert_daily_journal(user_id, day_key, response.text.trim())
            .await?;

        let ids: Vec<String> = summaries.into_iter().map(|s| s.id).collect();
        let deleted = self.storage.delete_turn_summaries(user_id, &ids).await?;
        debug!(user_id, day_key, consumed = deleted, "daily journal written");
        Ok(true)
    }

    /// Consolidate the trailing week of daily journals into one weekly
    /// journal per user, recording and deleting the consumed day keys.
    pub async fn run_weekly(&self) -> Result<RollupReport, AmikoError> {
        let cutoff = cutoff_before(Duration::days(7));
        let week_key = week_bucket_key(Utc::now());
        let mut report = RollupReport::default();

        for profile in self.storage.list_profiles().await? {
            match self
                .weekly_rollup_for_user(&profile.user_id, &cutoff, &week_key)
                .await
            {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(user_id = profile.user_id, error = %e, "weekly rollup failed");
                    report.failed += 1;
                }
            }
        }

        info!(%report, "weekly rollup sweep complete");
        Ok(report)
    }

    async fn weekly_rollup_for_user(
        &self,
        user_id: &str,
        cutoff: &str,
        week_key: &str,
    ) -> Result<bool, AmikoError> {
        let journals = self.storage.daily_journals_since(user_id, cutoff).await?;
        if journals.is_empty() {
            return Ok(false);
        }

        let sources = journals
            .iter()
            .map(|j| labeled_source(&j.day_key, &j.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = WEEKLY_ROLLUP_PROMPT.replace("{sources}", &sources);
        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;

        let day_keys: Vec<String> = journals.into_iter().map(|j| j.day_key).collect();
        self.storage
            .upsert_weekly_journal(user_id, week_key, response.text.trim(), &day_keys)
            .await?;

        let deleted = self.storage.delete_daily_journals(user_id, &day_keys).await?;
        debug!(user_id, week_key, consumed = deleted, "weekly journal written");
        Ok(true)
    }

    /// Consolidate the trailing ~month of weekly journals into one monthly
    /// journal per user, recording and deleting the consumed week keys.
    pub async fn run_monthly(&self) -> Result<RollupReport, AmikoError> {
        let cutoff = cutoff_before(Duration::days(31));
        let month_key = month_key(Utc::now());
        let mut report = RollupReport::default();

        for profile in self.storage.list_profiles().await? {
            match self
                .monthly_rollup_for_user(&profile.user_id, &cutoff, &month_key)
                .await
            {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(user_id = profile.user_id, error = %e, "monthly rollup failed");
                    report.failed += 1;
                }
            }
        }

        info!(%report, "monthly rollup sweep complete");
        Ok(report)
    }

    async fn monthly_rollup_for_user(
        &self,
        user_id: &str,
        cutoff: &str,
        month_key: &str,
    ) -> Result<bool, AmikoError> {
        let journals = self.storage.weekly_journals_since(user_id, cutoff).await?;
        if journals.is_empty() {
            return Ok(false);
        }

        let sources = journals
            .iter()
            .map(|j| labeled_source(&j.week_key, &j.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = MONTHLY_ROLLUP_PROMPT.replace("{sources}", &sources);
        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;

        let week_keys: Vec<String> = journals.into_iter().map(|j| j.week_key).collect();
        self.storage
            .upsert_monthly_journal(user_id, month_key, response.text.trim(), &week_keys)
            .await?;

        let deleted = self.storage.delete_weekly_journals(user_id, &week_keys).await?;
        debug!(user_id, month_key, consumed = deleted, "monthly journal written");
        Ok(true)
    }
}

/// RFC 3339 cutoff `window` before now, millisecond precision to match the
/// server-assigned timestamp format.
fn cutoff_before(window: Duration) -> String {
    (Utc::now() - window)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Label one journal with its key so the model can organize output by period.
fn labeled_source(key: &str, text: &str) -> String {
    format!("--- Journal for {key} ---\n{text}\n")
}

/// Calendar-date key, `YYYY-MM-DD`.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Week bucket key, `{Month}-week-{n}-{year}` with n in 1..=4.
///
/// Buckets are 7-day slices of the month; days 29-31 fold into week 4.
pub fn week_bucket_key(now: DateTime<Utc>) -> String {
    let week = ((now.day() - 1) / 7 + 1).min(4);
    format!("{}-week-{}-{}", now.format("%B"), week, now.year())
}

/// Month key, `{Month}-{Year}`.
pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%B-%Y").to_string()
}
