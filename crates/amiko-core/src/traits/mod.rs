// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The three adapter seams the companion is wired through.
//!
//! Each trait extends the [`PluginAdapter`] base and is object-safe, so the
//! binary and the tests can swap implementations behind `Arc<dyn _>`.

pub mod adapter;
pub mod channel;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
