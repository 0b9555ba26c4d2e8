// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proactive outreach sweeps.
//!
//! The [`OutreachRunner`] walks every profile on a timer and decides, per
//! user, whether the companion should speak first. Three triggers are
//! evaluated in priority order: a grounded news drop about one of the
//! user's interests, a sentiment check-in after hours of silence, and a
//! short timed follow-up when the companion's own last message went
//! unanswered. At most one fires per user per sweep.
//!
//! Every send goes through the same claim: `waiting_for_reply` is taken
//! with a compare-and-set before anything leaves, so overlapping sweeps
//! (or a sweep racing the agent loop) can never double-message a user.
//! Per-user failures are isolated; the sweep always finishes.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use amiko_config::{AmikoConfig, OutreachConfig};
use amiko_core::types::{
    ChatTurn, ProfilePatch, ProviderRequest, TurnRole, UserProfile, HISTORY_LEDGER_CAP,
};
use amiko_core::{AmikoError, ChannelAdapter, ProviderAdapter, StorageAdapter};

use crate::delivery::DeliveryEngine;

/// Hours between interest-driven news drops for one user.
const NEWS_COOLDOWN_HOURS: i64 = 6;

/// Hours of user silence before a sentiment check-in qualifies.
const SENTIMENT_INACTIVITY_HOURS: i64 = 4;

/// Turns read when labeling the user's recent mood.
const SENTIMENT_HISTORY_DEPTH: u32 = 18;

/// Hours between timed follow-ups for one user.
const FOLLOWUP_COOLDOWN_HOURS: i64 = 1;

const INTEREST_PROMPT: &str = "You are {agent}, a sharp and curious friend. Your friend is \
interested in: {topic}. Use Google Search to find ONE interesting piece of news or an update \
about it from the past 24-48 hours. Then craft a short, casual message to open a conversation \
about it. Tell them the highlights only, 1-2 lines max, and mention where you read it.";

const SENTIMENT_LABEL_PROMPT: &str = "Below is a recent conversation between YOU and a FRIEND. \
In one word, how does the friend seem to be feeling lately? Answer with a single lowercase \
word, like happy, stressed, tired, excited, or flat.\n\nCONVERSATION:\n{transcript}";

const CHECKIN_PROMPT: &str = "You are {agent}, texting a friend named {name} you haven't heard \
from in a few hours. Their recent mood read as: {sentiment}. Write ONE short, warm check-in, \
1-2 lines, that opens with their name like \"{name}, \". Keep it casual, no stacked questions.";

const FOLLOWUP_PROMPT: &str = "You are {agent}. You sent the last message below and your friend \
hasn't replied yet. Write ONE short, easy follow-up that picks the thread back up without any \
pressure. 1-2 lines max.\n\nRECENT MESSAGES:\n{transcript}";

/// Which trigger produced a proactive message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutreachKind {
    Interest,
    Checkin,
    Followup,
}

impl fmt::Display for OutreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutreachKind::Interest => "interest",
            OutreachKind::Checkin => "check-in",
            OutreachKind::Followup => "follow-up",
        };
        f.write_str(name)
    }
}

/// Outcome counts for one sweep across all users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Profiles examined.
    pub evaluated: usize,
    /// Users who received a proactive message.
    pub sent: usize,
    /// Users skipped by a gate or with no qualified trigger.
    pub skipped: usize,
    /// Users whose evaluation failed; retried on the next sweep.
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluated {}, sent {}, skipped {}, failed {}",
            self.evaluated, self.sent, self.skipped, self.failed
        )
    }
}

/// A generated proactive message, ready to claim and send.
struct PreparedOutreach {
    kind: OutreachKind,
    text: String,
    /// Interest consumed on a successful send.
    used_interest: Option<String>,
}

/// Periodic evaluator that lets the companion start conversations.
pub struct OutreachRunner {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    delivery: DeliveryEngine,
    config: OutreachConfig,
    agent_name: String,
    placeholder_name: String,
}

impl OutreachRunner {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        config: &AmikoConfig,
    ) -> Self {
        Self {
            storage,
            provider,
            delivery: DeliveryEngine::new(channel, config.delivery.clone()),
            config: config.outreach.clone(),
            agent_name: config.agent.name.clone(),
            placeholder_name: config.agent.placeholder_name.clone(),
        }
    }

    /// Evaluate every profile once. At most one proactive message goes out
    /// per user; one user's failure never aborts the rest.
    pub async fn run_sweep(&self) -> Result<SweepReport, AmikoError> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        for profile in self.storage.list_profiles().await? {
            report.evaluated += 1;
            match self.try_user(&profile, now).await {
                Ok(Some(kind)) => {
                    info!(user_id = profile.user_id, %kind, "proactive message sent");
                    report.sent += 1;
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(user_id = profile.user_id, error = %e, "outreach failed for user");
                    report.failed += 1;
                }
            }
        }

        info!(%report, "outreach sweep complete");
        Ok(report)
    }

    async fn try_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<OutreachKind>, AmikoError> {
        if !profile.onboarding_complete {
            debug!(user_id = profile.user_id, "skip: onboarding incomplete");
            return Ok(None);
        }
        if profile.waiting_for_reply {
            debug!(user_id = profile.user_id, "skip: awaiting a reply");
            return Ok(None);
        }
        if profile.chat_id.is_none() {
            debug!(user_id = profile.user_id, "skip: no chat route recorded");
            return Ok(None);
        }
        if !within_active_hours(profile, now) {
            debug!(user_id = profile.user_id, "skip: outside active hours");
            return Ok(None);
        }

        let prepared = if let Some(p) = self.prepare_interest(profile, now).await? {
            Some(p)
        } else if let Some(p) = self.prepare_checkin(profile, now).await? {
            Some(p)
        } else {
            self.prepare_followup(profile, now).await?
        };

        let Some(prepared) = prepared else {
            return Ok(None);
        };
        self.dispatch(profile, prepared).await
    }

    /// Claim the user, deliver the prepared message, and record it.
    ///
    /// The claim is the mutual-exclusion point: a false return means some
    /// other send won between our snapshot and now, so we stand down. A
    /// delivery that puts nothing on the wire releases the claim again.
    async fn dispatch(
        &self,
        profile: &UserProfile,
        prepared: PreparedOutreach,
    ) -> Result<Option<OutreachKind>, AmikoError> {
        let user_id = &profile.user_id;
        if !self.storage.claim_waiting_for_reply(user_id).await? {
            debug!(user_id, "skip: lost the waiting_for_reply claim");
            return Ok(None);
        }

        let chat_id = profile.chat_id.as_deref().unwrap_or(user_id);
        let sent = self.delivery.deliver(chat_id, &prepared.text).await;
        if sent == 0 {
            self.storage
                .update_profile(
                    user_id,
                    ProfilePatch {
                        waiting_for_reply: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
            return Err(AmikoError::Channel {
                message: "no outreach fragment was delivered".to_string(),
                source: None,
            });
        }

        self.storage
            .append_turn(user_id, TurnRole::Model, &prepared.text)
            .await?;

        match prepared.kind {
            OutreachKind::Interest => {
                self.storage
                    .update_profile(
                        user_id,
                        ProfilePatch {
                            stamp_last_news: true,
                            ..Default::default()
                        },
                    )
                    .await?;
                if let Some(topic) = &prepared.used_interest {
                    self.storage.remove_interest(user_id, topic).await?;
                }
            }
            OutreachKind::Checkin => {}
            OutreachKind::Followup => {
                self.storage
                    .update_profile(
                        user_id,
                        ProfilePatch {
                            stamp_last_followup: true,
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        Ok(Some(prepared.kind))
    }

    /// Interest trigger: a grounded news drop about one random interest,
    /// at most once per [`NEWS_COOLDOWN_HOURS`].
    async fn prepare_interest(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<PreparedOutreach>, AmikoError> {
        if profile.interests.is_empty() {
            return Ok(None);
        }
        if let Some(last) = parse_timestamp(profile.last_news_sent_at.as_deref()) {
            if now - last <= Duration::hours(NEWS_COOLDOWN_HOURS) {
                return Ok(None);
            }
        }
        let Some(topic) = profile.interests.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };

        let prompt = INTEREST_PROMPT
            .replace("{agent}", &self.agent_name)
            .replace("{topic}", &topic);
        let response = self
            .provider
            .complete_grounded(ProviderRequest::prompt(prompt))
            .await?;

        Ok(Some(PreparedOutreach {
            kind: OutreachKind::Interest,
            text: response.text.trim().to_string(),
            used_interest: Some(topic),
        }))
    }

    /// Check-in trigger: after hours of silence, label the user's recent
    /// mood, persist it, and open with their first name.
    async fn prepare_checkin(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<PreparedOutreach>, AmikoError> {
        let turns = self
            .storage
            .recent_turns(&profile.user_id, SENTIMENT_HISTORY_DEPTH)
            .await?;
        // No history at all counts as silence.
        if let Some(last) = turns.last() {
            match parse_timestamp(Some(&last.created_at)) {
                Some(at) if now - at > Duration::hours(SENTIMENT_INACTIVITY_HOURS) => {}
                _ => return Ok(None),
            }
        }

        let transcript = if turns.is_empty() {
            "(no recent messages)".to_string()
        } else {
            transcript(&turns)
        };
        let label_response = self
            .provider
            .complete(ProviderRequest::prompt(
                SENTIMENT_LABEL_PROMPT.replace("{transcript}", &transcript),
            ))
            .await?;
        let sentiment = normalize_sentiment(&label_response.text);
        self.storage
            .update_profile(
                &profile.user_id,
                ProfilePatch {
                    current_sentiment: Some(sentiment.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let name = sanitize_first_name(profile.display_name.as_deref(), &self.placeholder_name);
        let prompt = CHECKIN_PROMPT
            .replace("{agent}", &self.agent_name)
            .replace("{name}", &name)
            .replace("{sentiment}", &sentiment);
        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;

        Ok(Some(PreparedOutreach {
            kind: OutreachKind::Checkin,
            text: ensure_addressed(&name, &response.text),
            used_interest: None,
        }))
    }

    /// Follow-up trigger: the companion spoke last a short while ago and
    /// nothing came back; a probability draw keeps it from being clingy.
    async fn prepare_followup(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<PreparedOutreach>, AmikoError> {
        let turns = self
            .storage
            .recent_turns(&profile.user_id, HISTORY_LEDGER_CAP as u32)
            .await?;
        let Some(last) = turns.last() else {
            return Ok(None);
        };
        if last.role != TurnRole::Model {
            return Ok(None);
        }
        // Timestamp ties are ambiguous; treat them as answered.
        if turns
            .iter()
            .any(|t| t.role == TurnRole::User && t.created_at >= last.created_at)
        {
            return Ok(None);
        }
        let Some(last_at) = parse_timestamp(Some(&last.created_at)) else {
            return Ok(None);
        };
        if !followup_window_open(
            now - last_at,
            self.config.followup_center_minutes,
            self.config.followup_tolerance_minutes,
        ) {
            return Ok(None);
        }
        if let Some(prev) = parse_timestamp(profile.last_followup_sent_at.as_deref()) {
            if now - prev < Duration::hours(FOLLOWUP_COOLDOWN_HOURS) {
                return Ok(None);
            }
        }
        if rand::thread_rng().gen::<f64>() >= self.config.followup_probability {
            debug!(user_id = profile.user_id, "follow-up declined by draw");
            return Ok(None);
        }

        let depth = self.config.followup_history_depth.min(turns.len());
        let recent = &turns[turns.len() - depth..];
        let prompt = FOLLOWUP_PROMPT
            .replace("{agent}", &self.agent_name)
            .replace("{transcript}", &transcript(recent));
        let response = self.provider.complete(ProviderRequest::prompt(prompt)).await?;

        Ok(Some(PreparedOutreach {
            kind: OutreachKind::Followup,
            text: response.text.trim().to_string(),
            used_interest: None,
        }))
    }
}

/// True when `hour` falls inside the window, wrapping past midnight when
/// `start >= end`.
pub(crate) fn within_window(start: u8, end: u8, hour: u8) -> bool {
    if start < end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Strict active-hours gate: any missing or unusable piece of the local
/// window means no proactive contact.
fn within_active_hours(profile: &UserProfile, now: DateTime<Utc>) -> bool {
    let (Some(tz_name), Some(start), Some(end)) = (
        profile.timezone.as_deref(),
        profile.active_hours_start,
        profile.active_hours_end,
    ) else {
        debug!(user_id = profile.user_id, "active hours not configured");
        return false;
    };
    // start == end is the unconfigured sentinel, not a 24h window.
    if start == end {
        return false;
    }
    let Ok(tz) = tz_name.parse::<Tz>() else {
        warn!(user_id = profile.user_id, timezone = tz_name, "unknown timezone on profile");
        return false;
    };
    let hour = now.with_timezone(&tz).hour() as u8;
    within_window(start, end, hour)
}

/// The follow-up window: strictly after the message, strictly before
/// `center + tolerance` minutes.
fn followup_window_open(age: Duration, center_minutes: i64, tolerance_minutes: i64) -> bool {
    age > Duration::zero() && age < Duration::minutes(center_minutes + tolerance_minutes)
}

fn parse_timestamp(ts: Option<&str>) -> Option<DateTime<Utc>> {
    ts.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| match t.role {
            TurnRole::User => format!("FRIEND: {}", t.text),
            TurnRole::Model => format!("YOU: {}", t.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First name safe to address the user by: letters, spaces, apostrophes
/// and hyphens survive, the first token wins, and the first letter is
/// capitalized. Anything unusable falls back to the placeholder.
pub(crate) fn sanitize_first_name(display_name: Option<&str>, placeholder: &str) -> String {
    let cleaned: String = display_name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || *c == '\'' || *c == '-')
        .collect();
    let Some(first) = cleaned.split_whitespace().next() else {
        return placeholder.to_string();
    };
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => placeholder.to_string(),
    }
}

/// Guarantee the check-in opens with `"<Name>, "` even when the model
/// ignored the instruction.
pub(crate) fn ensure_addressed(name: &str, text: &str) -> String {
    let trimmed = text.trim();
    let prefix = format!("{name},");
    if trimmed
        .to_lowercase()
        .starts_with(&prefix.to_lowercase())
    {
        trimmed.to_string()
    } else {
        format!("{name}, {trimmed}")
    }
}

/// Collapse a sentiment label to one lowercase word.
pub(crate) fn normalize_sentiment(raw: &str) -> String {
    let word: String = raw
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    if word.is_empty() {
        "neutral".to_string()
    } else {
        word.to_lowercase()
    }
}
