// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Amiko companion backend.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The short-term history ledger retains at most this many turns per user.
pub const HISTORY_LEDGER_CAP: usize = 20;

/// Maximum number of entries kept in a profile's `about` list.
pub const ABOUT_MAX_ENTRIES: usize = 10;

/// Maximum length of a single `about` entry, in characters.
pub const ABOUT_MAX_ENTRY_CHARS: usize = 200;

/// Unique identifier for a transport-level message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
}

/// The speaker of a chat turn. Stored as `user` / `model` and reused as the
/// provider-side conversation role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// Onboarding question currently awaiting an answer.
///
/// The values are the wire/storage names of the `pending_question` field;
/// onboarding is complete when the profile carries none of them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    AuthKey,
    Timezone,
    ActiveHoursStart,
    ActiveHoursEnd,
    Name,
}

/// Persistent per-user record. One per end user, keyed by the stable
/// transport sender id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Transport-level routing id, recorded on first contact so proactive
    /// sweeps can address the user without an inbound message in hand.
    pub chat_id: Option<String>,
    pub onboarding_complete: bool,
    pub authorized: bool,
    pub pending_question: Option<OnboardingStep>,
    /// Mutual-exclusion flag: true while a proactive question/message is
    /// outstanding. Cleared by the next inbound user message.
    pub waiting_for_reply: bool,
    /// IANA timezone id, e.g. `Asia/Kolkata`.
    pub timezone: Option<String>,
    /// Local hour (0-23) from which proactive contact is allowed.
    pub active_hours_start: Option<u8>,
    /// Local hour (0-23) before which proactive contact is allowed.
    pub active_hours_end: Option<u8>,
    /// Topics eligible for interest-driven outreach; consumed on use.
    pub interests: Vec<String>,
    /// Accumulated personal facts, newest-last, bounded by
    /// [`ABOUT_MAX_ENTRIES`] / [`ABOUT_MAX_ENTRY_CHARS`].
    pub about: Vec<String>,
    pub current_sentiment: Option<String>,
    pub display_name: Option<String>,
    /// RFC 3339, server-assigned on the successful send.
    pub last_news_sent_at: Option<String>,
    /// RFC 3339, server-assigned on the successful send.
    pub last_followup_sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Merge-patch for a [`UserProfile`]. `None` fields are left unchanged;
/// set-valued fields (`interests`, `about`) have dedicated union/remove
/// storage operations instead of appearing here.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub chat_id: Option<String>,
    pub onboarding_complete: Option<bool>,
    pub authorized: Option<bool>,
    /// Outer `None` leaves the field untouched; `Some(None)` clears it.
    pub pending_question: Option<Option<OnboardingStep>>,
    pub waiting_for_reply: Option<bool>,
    pub timezone: Option<String>,
    pub active_hours_start: Option<u8>,
    pub active_hours_end: Option<u8>,
    pub current_sentiment: Option<String>,
    pub display_name: Option<String>,
    /// Stamp `last_news_sent_at` with the server clock.
    pub stamp_last_news: bool,
    /// Stamp `last_followup_sent_at` with the server clock.
    pub stamp_last_followup: bool,
}

impl ProfilePatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.chat_id.is_none()
            && self.onboarding_complete.is_none()
            && self.authorized.is_none()
            && self.pending_question.is_none()
            && self.waiting_for_reply.is_none()
            && self.timezone.is_none()
            && self.active_hours_start.is_none()
            && self.active_hours_end.is_none()
            && self.current_sentiment.is_none()
            && self.display_name.is_none()
            && !self.stamp_last_news
            && !self.stamp_last_followup
    }
}

/// One immutable entry of the short-term history ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub user_id: String,
    pub role: TurnRole,
    pub text: String,
    /// RFC 3339, server-assigned.
    pub created_at: String,
}

/// A 1-2 sentence abstraction of one conversational turn, produced after the
/// turn is saved and consumed by the daily rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSummary {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

/// Consolidated journal for one calendar day, keyed `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyJournal {
    pub user_id: String,
    pub day_key: String,
    pub text: String,
    pub created_at: String,
}

/// Consolidated journal for one week bucket, keyed `{Month}-week-{n}-{year}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyJournal {
    pub user_id: String,
    pub week_key: String,
    pub text: String,
    /// Day keys of the daily journals this entry consumed.
    pub source_daily_keys: Vec<String>,
    pub created_at: String,
}

/// Consolidated journal for one month, keyed `{Month}-{Year}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyJournal {
    pub user_id: String,
    pub month_key: String,
    pub text: String,
    /// Week keys of the weekly journals this entry consumed.
    pub source_weekly_keys: Vec<String>,
    pub created_at: String,
}

// --- Channel types ---

/// An inbound message received from a channel adapter. Image messages arrive
/// with their caption as `text`; messages with no text content are dropped at
/// the adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    /// Channel adapter name, e.g. `telegram`.
    pub channel: String,
    /// Stable sender id; profiles are keyed by this.
    pub sender_id: String,
    /// Transport routing id for replies.
    pub chat_id: String,
    /// Sender's transport display name, if the platform exposes one.
    pub sender_name: Option<String>,
    pub text: String,
    /// RFC 3339 receipt time.
    pub timestamp: String,
}

/// An outbound text message to be sent via a channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub text: String,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_typing: bool,
    pub max_message_length: Option<u32>,
}

// --- Provider types ---

/// A request to the language-model service.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// System instruction (persona or task framing).
    pub system_prompt: Option<String>,
    /// Conversation in chronological order; the final message is the prompt.
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    /// A single-shot prompt with no history and no system instruction.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            messages: vec![ProviderMessage {
                role: TurnRole::User,
                content: text.into(),
            }],
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }
}

/// One message of provider-side conversation context.
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub role: TurnRole,
    pub content: String,
}

/// A response from the language-model service. Grounded completions return
/// text only; citations are best-effort and not surfaced here.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn turn_role_round_trips_as_lowercase() {
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::Model.to_string(), "model");
        assert_eq!(TurnRole::from_str("model").unwrap(), TurnRole::Model);
    }

    #[test]
    fn onboarding_step_round_trips_as_snake_case() {
        for step in [
            OnboardingStep::AuthKey,
            OnboardingStep::Timezone,
            OnboardingStep::ActiveHoursStart,
            OnboardingStep::ActiveHoursEnd,
            OnboardingStep::Name,
        ] {
            let s = step.to_string();
            assert_eq!(OnboardingStep::from_str(&s).unwrap(), step);
        }
        assert_eq!(OnboardingStep::AuthKey.to_string(), "auth_key");
        assert_eq!(
            OnboardingStep::ActiveHoursStart.to_string(),
            "active_hours_start"
        );
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(ProfilePatch::default().is_empty());
        let patch = ProfilePatch {
            waiting_for_reply: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        let stamp_only = ProfilePatch {
            stamp_last_news: true,
            ..Default::default()
        };
        assert!(!stamp_only.is_empty());
    }

    #[test]
    fn prompt_request_has_single_user_message() {
        let req = ProviderRequest::prompt("hello").with_system("be brief");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, TurnRole::User);
        assert_eq!(req.system_prompt.as_deref(), Some("be brief"));
    }
}
