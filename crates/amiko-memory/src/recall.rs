// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journal-grounded question answering.
//!
//! Recall answers a direct question from the user's consolidated journals
//! only. All three tiers are concatenated into one context blob and injected
//! ahead of the recent history, so the model sees long-term memory first and
//! the live conversation after it.

use std::sync::Arc;

use tracing::debug;

use amiko_core::types::{ProviderMessage, ProviderRequest, TurnRole};
use amiko_core::{AmikoError, ProviderAdapter, StorageAdapter};

/// Reply sent when a user asks for recall before any journal exists.
pub const NO_JOURNALS_REPLY: &str =
    "I don't have any long-term memories saved for us yet. Give it a day or two and ask me again.";

/// Answers questions against the user's journal tiers.
pub struct RecallEngine {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    /// Recent turns carried alongside the journal context.
    history_depth: u32,
}

impl RecallEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        history_depth: u32,
    ) -> Self {
        Self {
            storage,
            provider,
            history_depth,
        }
    }

    /// Answer `question` from the user's journals.
    ///
    /// Returns `Ok(None)` when the user has no journals at any tier; the
    /// model is not invoked in that case and the caller sends
    /// [`NO_JOURNALS_REPLY`] instead.
    pub async fn answer(
        &self,
        user_id: &str,
        question: &str,
    ) -> Result<Option<String>, AmikoError> {
        let blob = self.build_memory_blob(user_id).await?;
        let Some(blob) = blob else {
            debug!(user_id, "recall requested with no journals");
            return Ok(None);
        };

        let mut messages = vec![ProviderMessage {
            role: TurnRole::User,
            content: format!(
                "--- Start of All Journals (Monthly, Weekly, Daily) ---\n{blob}\n--- End of All Journals ---"
            ),
        }];

        for turn in self.storage.recent_turns(user_id, self.history_depth).await? {
            messages.push(ProviderMessage {
                role: turn.role,
                content: turn.text,
            });
        }

        messages.push(ProviderMessage {
            role: TurnRole::User,
            content: format!(
                "Answer my question using only the journal context provided above. My question is: {question}"
            ),
        });

        let request = ProviderRequest {
            system_prompt: None,
            messages,
            max_tokens: None,
        };
        let response = self.provider.complete(request).await?;
        Ok(Some(response.text))
    }

    /// Concatenate every journal tier, coarsest first, labeled by key.
    ///
    /// Returns `None` when all tiers are empty.
    async fn build_memory_blob(&self, user_id: &str) -> Result<Option<String>, AmikoError> {
        let mut sections = Vec::new();

        for journal in self.storage.list_monthly_journals(user_id).await? {
            sections.push(format!(
                "--- Monthly Journal: {} ---\n{}\n",
                journal.month_key, journal.text
            ));
        }
        for journal in self.storage.list_weekly_journals(user_id).await? {
            sections.push(format!(
                "--- Weekly Journal: {} ---\n{}\n",
                journal.week_key, journal.text
            ));
        }
        for journal in self.storage.list_daily_journals(user_id).await? {
            sections.push(format!(
                "--- Daily Journal: {} ---\n{}\n",
                journal.day_key, journal.text
            ));
        }

        if sections.is_empty() {
            return Ok(None);
        }
        Ok(Some(sections.join("\n")))
    }
}
