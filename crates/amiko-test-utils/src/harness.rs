// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration testing.
//!
//! `TestHarness` assembles the shared substrate every integration test
//! needs: a temp SQLite database (initialized), a mock provider, a mock
//! channel, and a default configuration. Higher-level pieces (the agent
//! loop, the outreach sweep, the consolidator) are constructed by the tests
//! themselves from these parts, so each test wires exactly the pipeline it
//! exercises.

use std::sync::Arc;

use amiko_config::{AmikoConfig, StorageConfig};
use amiko_core::{AmikoError, StorageAdapter};
use amiko_storage::SqliteStorage;

use crate::mock_channel::MockChannel;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    persona: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            persona: None,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Set a custom persona instruction.
    pub fn with_persona(mut self, persona: String) -> Self {
        self.persona = Some(persona);
        self
    }

    /// Build the test harness, creating and initializing the temp database.
    pub async fn build(self) -> Result<TestHarness, AmikoError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| AmikoError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(storage_config.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let mock_provider = Arc::new(if self.responses.is_empty() {
            MockProvider::new()
        } else {
            MockProvider::with_responses(self.responses)
        });
        let mock_channel = Arc::new(MockChannel::new());

        let mut config = AmikoConfig {
            storage: storage_config,
            ..AmikoConfig::default()
        };
        config.agent.persona = self.persona;
        // Deterministic pacing in tests.
        config.delivery.per_word_delay_ms = 0;
        config.delivery.min_delay_ms = 0;
        config.delivery.max_delay_ms = 0;

        Ok(TestHarness {
            mock_provider,
            mock_channel,
            storage,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock language-model provider.
    pub mock_provider: Arc<MockProvider>,
    /// The mock channel adapter.
    pub mock_channel: Arc<MockChannel>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    /// Amiko configuration with the temp database path and zeroed delivery
    /// delays.
    pub config: AmikoConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Add a response to the mock provider's queue.
    pub async fn add_provider_response(&self, text: String) {
        self.mock_provider.add_response(text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amiko_core::types::ProviderRequest;
    use amiko_core::ProviderAdapter;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        // Storage should be functional
        let profiles = harness.storage.list_profiles().await.unwrap();
        assert!(profiles.is_empty());
    }

    #[tokio::test]
    async fn with_mock_responses_preloads_queue() {
        let harness = TestHarness::builder()
            .with_mock_responses(vec!["custom response".to_string()])
            .build()
            .await
            .unwrap();

        let resp = harness
            .mock_provider
            .complete(ProviderRequest::prompt("hello"))
            .await
            .unwrap();
        assert_eq!(resp.text, "custom response");
    }

    #[tokio::test]
    async fn delivery_delays_are_zeroed() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.config.delivery.per_word_delay_ms, 0);
        assert_eq!(harness.config.delivery.min_delay_ms, 0);
        assert_eq!(harness.config.delivery.max_delay_ms, 0);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.storage.create_profile("u1").await.unwrap();
        let p1 = h1.storage.list_profiles().await.unwrap();
        let p2 = h2.storage.list_profiles().await.unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p2.len(), 0); // h2 has its own DB
    }
}
