// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the language-model service.

use async_trait::async_trait;

use crate::error::AmikoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for language-model invocation.
///
/// Two completion modes: plain text completion over an optional conversation
/// history, and search-grounded completion where the model may consult live
/// web results before answering.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, AmikoError>;

    /// Sends a completion request with web-search grounding enabled.
    /// Returns text only; citations are best-effort and not surfaced.
    async fn complete_grounded(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, AmikoError>;
}
