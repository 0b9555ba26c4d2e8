// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from completed turns.
//!
//! After each reply is delivered, the learner asks the model for new
//! personal information revealed in the exchange and merges it into the
//! user's profile. Extraction runs off the reply path and is best-effort:
//! any failure logs and changes nothing.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use amiko_core::types::{ABOUT_MAX_ENTRY_CHARS, ProviderRequest};
use amiko_core::{ProviderAdapter, StorageAdapter};

/// Prompt for profile-delta extraction.
const EXTRACTION_PROMPT: &str = r#"Analyze this conversation. Extract only dynamic, personal user information. Look for new "interests" (hobbies, likes, dislikes) or new "about" facts (personal info, memories, relationships). Return only JSON in this format, or an empty object {} if there is nothing new:
{"interests": ["new interest"], "about": "new fact about the user"}

USER: "{user}"
MODEL: "{model}"

Output JSON only, no explanation:"#;

/// Extracts profile facts from turn pairs and merges them into storage.
pub struct FactLearner {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
}

impl FactLearner {
    pub fn new(storage: Arc<dyn StorageAdapter>, provider: Arc<dyn ProviderAdapter>) -> Self {
        Self { storage, provider }
    }

    /// Learn from one completed (user, model) turn pair.
    ///
    /// Never returns an error: extraction calls, parsing, and merges that
    /// fail are logged and the profile is left unchanged.
    pub async fn learn_from_turn(&self, user_id: &str, user_text: &str, model_text: &str) {
        let prompt = build_extraction_prompt(user_text, model_text);

        let response = match self.provider.complete(ProviderRequest::prompt(prompt)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(user_id, error = %e, "fact extraction call failed");
                return;
            }
        };

        let delta = parse_extraction_response(&response.text);
        if delta.is_empty() {
            debug!(user_id, "no new facts in turn");
            return;
        }

        let interests: Vec<String> = delta
            .interests
            .iter()
            .filter_map(|i| normalize_entry(i))
            .collect();
        if !interests.is_empty()
            && let Err(e) = self.storage.add_interests(user_id, &interests).await
        {
            warn!(user_id, error = %e, "failed to merge learned interests");
        }

        let facts: Vec<String> = delta
            .about
            .map(AboutField::into_vec)
            .unwrap_or_default()
            .iter()
            .filter_map(|f| normalize_entry(f))
            .collect();
        if !facts.is_empty()
            && let Err(e) = self.storage.add_about_facts(user_id, &facts).await
        {
            warn!(user_id, error = %e, "failed to merge learned facts");
        }

        debug!(
            user_id,
            interests = interests.len(),
            facts = facts.len(),
            "learned new profile data"
        );
    }
}

/// A profile delta extracted from one turn. Both fields optional; the model
/// may return either an `about` string or a list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractionDelta {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub about: Option<AboutField>,
}

impl ExtractionDelta {
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty() && self.about.is_none()
    }
}

/// The `about` field as the model returns it: one fact or several.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AboutField {
    One(String),
    Many(Vec<String>),
}

impl AboutField {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            AboutField::One(fact) => vec![fact],
            AboutField::Many(facts) => facts,
        }
    }
}

/// Build the extraction prompt for one turn pair.
fn build_extraction_prompt(user_text: &str, model_text: &str) -> String {
    EXTRACTION_PROMPT
        .replace("{user}", user_text)
        .replace("{model}", model_text)
}

/// Parse the model's extraction output into a structured delta.
///
/// Tolerant chain: strip code fences, try a strict parse, then retry on the
/// outermost `{...}` slice. Bottoms out at an empty delta, never an error.
pub fn parse_extraction_response(response: &str) -> ExtractionDelta {
    let stripped = strip_code_fences(response.trim());

    if let Ok(delta) = serde_json::from_str::<ExtractionDelta>(stripped) {
        return delta;
    }

    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}'))
        && start < end
        && let Ok(delta) = serde_json::from_str::<ExtractionDelta>(&stripped[start..=end])
    {
        return delta;
    }

    warn!("failed to parse extraction response, treating as empty");
    debug!(raw = response, "unparsable extraction output");
    ExtractionDelta::default()
}

/// Strip a leading ```/```json line and a trailing ``` line, if present.
fn strip_code_fences(text: &str) -> &str {
    let mut inner = text;
    if inner.starts_with("```") {
        inner = match inner.find('\n') {
            Some(idx) => &inner[idx + 1..],
            None => "",
        };
    }
    if let Some(rest) = inner.trim_end().strip_suffix("```") {
        inner = rest;
    }
    inner.trim()
}

/// Collapse internal whitespace and cap the entry length. Empty after
/// normalization means nothing worth keeping.
fn normalize_entry(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(ABOUT_MAX_ENTRY_CHARS).collect())
}
