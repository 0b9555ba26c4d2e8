// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the Gemini generateContent API.
//!
//! Field names follow the REST v1beta JSON mapping, which is camelCase for
//! everything except the `google_search` tool key.

use serde::{Deserialize, Serialize};

/// A single text part within a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

/// One conversational turn in the request, role `user` or `model`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// System prompt carrier. Unlike [`Content`] it has no role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

impl SystemInstruction {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Generation tuning knobs. Only the ones Amiko uses are modeled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Grounding tool marker. Serializes to an empty JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GoogleSearch {}

/// A tool made available to the model for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub google_search: GoogleSearch,
}

/// Request body for `models/{model}:generateContent`.
///
/// The model id lives in the URL, not the body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

/// One model candidate in the response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

/// Content of a candidate. Parts may be absent when generation was blocked.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion", default)]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, empty when the
    /// model returned nothing usable.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub status: String,
}
