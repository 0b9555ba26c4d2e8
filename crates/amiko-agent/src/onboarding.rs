// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Onboarding question chain.
//!
//! A pure state machine over [`OnboardingStep`]: given the question currently
//! pending and the user's raw answer, it produces a [`Transition`] naming the
//! profile fields to persist and the next message to send. The agent loop
//! applies all side effects; nothing in here touches storage or the channel.
//!
//! The chain is `auth_key -> timezone -> active_hours_start ->
//! active_hours_end -> name`, with the auth-key question skipped entirely
//! when no key is configured. A rejected answer re-asks the same question
//! and changes no state.

use amiko_core::types::{OnboardingStep, ProfilePatch};
use amiko_config::OnboardingConfig;
use chrono_tz::Tz;

/// Fixed reply to any non-command message from a user who has not finished
/// onboarding.
pub const START_NUDGE: &str =
    "Hey! We haven't been properly introduced yet. Send /start and I'll get us set up.";

/// Reply to `/start` from a user whose onboarding is already complete.
pub const ALREADY_ONBOARDED: &str =
    "Hey again! We're already set up, nothing to redo. Just talk to me.";

const AUTH_KEY_QUESTION: &str =
    "First things first: what's the access key? You'd have gotten it from whoever set me up.";
const TIMEZONE_QUESTION: &str =
    "What timezone are you in? Give me the IANA name, like Asia/Kolkata or Europe/Berlin.";
const HOURS_START_QUESTION: &str =
    "When do you usually surface in the morning? Just the hour, like 8.";
const HOURS_END_QUESTION: &str =
    "And when should I go quiet at night? Again just the hour, 23 for 11pm, or 1 if you're a night owl.";
const NAME_QUESTION: &str = "Last one: what should I call you?";
const CONFIRMATION: &str =
    "That's everything, we're set! I'll check in now and then. Talk soon.";

const AUTH_KEY_RETRY: &str = "Hmm, that key doesn't match what I have. Mind trying again?";
const TIMEZONE_RETRY: &str =
    "I don't recognize that one. It needs to be an IANA timezone like Asia/Kolkata or America/New_York. One more try?";
const HOUR_RETRY: &str = "I just need a number from 0 to 23 for that. Try again?";
const NAME_RETRY: &str = "I didn't catch a name in there. What should I call you?";

/// Result of feeding one answer to the pending question.
///
/// Every variant carries the exact text to send back; `Advance` and
/// `Complete` also carry the profile patch the caller must persist. The
/// patch always includes the `pending_question` transition itself.
#[derive(Debug)]
pub enum Transition {
    /// Answer accepted; persist the patch and ask the next question.
    Advance {
        patch: ProfilePatch,
        prompt: &'static str,
    },
    /// Final answer accepted; the chain is done.
    Complete {
        patch: ProfilePatch,
        confirmation: &'static str,
    },
    /// Answer rejected; same question again, no state change.
    Retry { message: &'static str },
}

/// First question of the chain for a `/start`.
///
/// Users who already hold authorization (or when no key is configured at
/// all) skip straight to the timezone question.
pub fn entry_step(config: &OnboardingConfig, authorized: bool) -> OnboardingStep {
    if config.auth_key.is_some() && !authorized {
        OnboardingStep::AuthKey
    } else {
        OnboardingStep::Timezone
    }
}

/// The question text for a given step.
pub fn question_for(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::AuthKey => AUTH_KEY_QUESTION,
        OnboardingStep::Timezone => TIMEZONE_QUESTION,
        OnboardingStep::ActiveHoursStart => HOURS_START_QUESTION,
        OnboardingStep::ActiveHoursEnd => HOURS_END_QUESTION,
        OnboardingStep::Name => NAME_QUESTION,
    }
}

/// Intro line sent ahead of the first question.
pub fn intro_line(agent_name: &str) -> String {
    format!(
        "Hey, {agent_name} here! Before we can really chat I have a few quick setup questions. Promise it's painless."
    )
}

/// Feed one answer to the pending question and compute the transition.
pub fn apply_answer(step: OnboardingStep, answer: &str, config: &OnboardingConfig) -> Transition {
    let answer = answer.trim();
    match step {
        OnboardingStep::AuthKey => match &config.auth_key {
            Some(expected) if answer != expected => Transition::Retry {
                message: AUTH_KEY_RETRY,
            },
            // Correct key, or the key was unconfigured after the question
            // was asked. Either way the gate is open.
            _ => advance(
                ProfilePatch {
                    authorized: Some(true),
                    ..Default::default()
                },
                OnboardingStep::Timezone,
            ),
        },
        OnboardingStep::Timezone => match answer.parse::<Tz>() {
            Ok(tz) => advance(
                ProfilePatch {
                    timezone: Some(tz.name().to_string()),
                    ..Default::default()
                },
                OnboardingStep::ActiveHoursStart,
            ),
            Err(_) => Transition::Retry {
                message: TIMEZONE_RETRY,
            },
        },
        OnboardingStep::ActiveHoursStart => match parse_hour(answer) {
            Some(hour) => advance(
                ProfilePatch {
                    active_hours_start: Some(hour),
                    ..Default::default()
                },
                OnboardingStep::ActiveHoursEnd,
            ),
            None => Transition::Retry {
                message: HOUR_RETRY,
            },
        },
        OnboardingStep::ActiveHoursEnd => match parse_hour(answer) {
            Some(hour) => advance(
                ProfilePatch {
                    active_hours_end: Some(hour),
                    ..Default::default()
                },
                OnboardingStep::Name,
            ),
            None => Transition::Retry {
                message: HOUR_RETRY,
            },
        },
        OnboardingStep::Name => {
            if answer.is_empty() {
                return Transition::Retry {
                    message: NAME_RETRY,
                };
            }
            Transition::Complete {
                patch: ProfilePatch {
                    display_name: Some(answer.to_string()),
                    onboarding_complete: Some(true),
                    pending_question: Some(None),
                    waiting_for_reply: Some(false),
                    ..Default::default()
                },
                confirmation: CONFIRMATION,
            }
        }
    }
}

fn advance(mut patch: ProfilePatch, next: OnboardingStep) -> Transition {
    patch.pending_question = Some(Some(next));
    // Each question is an outstanding proactive message until answered.
    patch.waiting_for_reply = Some(true);
    Transition::Advance {
        patch,
        prompt: question_for(next),
    }
}

/// Local hour in `0..=23`, or `None` for anything else.
fn parse_hour(answer: &str) -> Option<u8> {
    answer.parse::<u8>().ok().filter(|h| *h < 24)
}
