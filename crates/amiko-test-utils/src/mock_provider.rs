// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language-model provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a pre-configured outcome
//! queue and full request capture, enabling fast, CI-runnable tests without
//! external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use amiko_core::traits::adapter::PluginAdapter;
use amiko_core::traits::provider::ProviderAdapter;
use amiko_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse};
use amiko_core::AmikoError;

/// One request captured by the mock, with the completion mode it arrived on.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ProviderRequest,
    /// True when the request came in through `complete_grounded`.
    pub grounded: bool,
}

/// A mock provider that replays pre-configured outcomes.
///
/// Outcomes are popped from a FIFO queue shared by both completion modes;
/// `Ok` entries become responses, `Err` entries become provider errors. When
/// the queue is empty, a default "mock response" text is returned. Every
/// request is captured for assertion via [`requests`](MockProvider::requests).
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty outcome queue.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with the given response texts.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a successful response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.outcomes.lock().await.push_back(Ok(text));
    }

    /// Add a failure to the end of the queue. The matching request will
    /// error with the given message.
    pub async fn add_failure(&self, message: String) {
        self.outcomes.lock().await.push_back(Err(message));
    }

    /// All requests captured so far, in arrival order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Pop the next outcome, defaulting when the queue is empty.
    async fn next_outcome(&self) -> Result<String, String> {
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()))
    }

    async fn respond(
        &self,
        request: ProviderRequest,
        grounded: bool,
    ) -> Result<ProviderResponse, AmikoError> {
        self.requests
            .lock()
            .await
            .push(RecordedRequest { request, grounded });

        match self.next_outcome().await {
            Ok(text) => Ok(ProviderResponse {
                text,
                model: "mock-model".to_string(),
            }),
            Err(message) => Err(AmikoError::Provider {
                message,
                source: None,
            }),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, AmikoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AmikoError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, AmikoError> {
        self.respond(request, false).await
    }

    async fn complete_grounded(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, AmikoError> {
        self.respond(request, true).await
    }
}
