// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared foundation of the Amiko workspace.
//!
//! Holds the error enum, the domain types (profiles, turns, journals,
//! messages), and the adapter traits every other crate builds on. Nothing
//! in here does I/O.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AmikoError;
pub use types::{AdapterType, HealthStatus, MessageId, OnboardingStep, TurnRole};

pub use traits::{ChannelAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};
