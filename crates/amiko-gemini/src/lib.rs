// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini provider adapter for the Amiko companion backend.
//!
//! This crate implements [`ProviderAdapter`] for the Gemini generateContent
//! API, providing plain completion and search-grounded completion where the
//! model may consult live web results before answering.

pub mod client;
pub mod types;

use async_trait::async_trait;
use tracing::{debug, info};

use amiko_config::GeminiConfig;
use amiko_core::types::{ProviderRequest, ProviderResponse};
use amiko_core::{AdapterType, AmikoError, HealthStatus, PluginAdapter, ProviderAdapter};

use crate::client::GeminiClient;
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, GoogleSearch,
    Part, SystemInstruction, Tool,
};

/// Gemini provider implementing [`ProviderAdapter`].
///
/// Supports plain completion and search-grounded completion. API key
/// resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiProvider {
    client: GeminiClient,
    max_tokens: u32,
}

impl GeminiProvider {
    /// Creates a new Gemini provider from the given configuration.
    ///
    /// # API Key Resolution
    /// 1. `config.api_key` if set
    /// 2. `GEMINI_API_KEY` environment variable
    /// 3. Returns error if neither is available
    pub fn new(config: &GeminiConfig) -> Result<Self, AmikoError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(api_key, config.model.clone())?;

        info!(model = config.model, "Gemini provider initialized");

        Ok(Self {
            client,
            max_tokens: config.max_tokens,
        })
    }

    /// Creates a provider with an existing client (for testing).
    #[cfg(test)]
    fn with_client(client: GeminiClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    /// Converts a [`ProviderRequest`] to a Gemini [`GenerateContentRequest`].
    ///
    /// Turn roles serialize to the wire values `user` and `model`. When the
    /// request carries no token limit, the configured default applies.
    fn to_generate_request(
        &self,
        request: &ProviderRequest,
        grounded: bool,
    ) -> GenerateContentRequest {
        let contents: Vec<Content> = request
            .messages
            .iter()
            .map(|m| Content {
                role: m.role.to_string(),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system_instruction = request
            .system_prompt
            .clone()
            .map(SystemInstruction::from_text);

        let tools = grounded.then(|| {
            vec![Tool {
                google_search: GoogleSearch::default(),
            }]
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            }),
            tools,
        }
    }

    /// Converts a Gemini response into a [`ProviderResponse`].
    ///
    /// An empty completion is an error: callers always expect usable text,
    /// and Gemini signals blocked or truncated generations by returning a
    /// candidate with no parts.
    fn to_provider_response(
        &self,
        response: GenerateContentResponse,
    ) -> Result<ProviderResponse, AmikoError> {
        let text = response.text();
        if text.trim().is_empty() {
            let reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(AmikoError::Provider {
                message: format!("model returned no text ({reason})"),
                source: None,
            });
        }

        let model = response
            .model_version
            .unwrap_or_else(|| self.client.model().to_string());

        Ok(ProviderResponse { text, model })
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, AmikoError> {
        // Verifying the client exists is enough; a full check would make an
        // API call, and we avoid consuming tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AmikoError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, AmikoError> {
        let api_request = self.to_generate_request(&request, false);
        let response = self.client.generate(&api_request).await?;
        self.to_provider_response(response)
    }

    async fn complete_grounded(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, AmikoError> {
        let api_request = self.to_generate_request(&request, true);
        let response = self.client.generate(&api_request).await?;
        self.to_provider_response(response)
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, AmikoError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        AmikoError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}
