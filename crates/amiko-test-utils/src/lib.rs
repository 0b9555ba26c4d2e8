// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Amiko integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock model provider with an outcome queue and request capture
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`TestHarness`] - Temp-database environment assembling the mocks and config

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_provider::{MockProvider, RecordedRequest};
