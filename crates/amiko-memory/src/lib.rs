// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered long-term memory for the Amiko companion.
//!
//! Raw conversation turns are compressed into summaries as they happen, then
//! periodically consolidated upward through three journal tiers (daily,
//! weekly, monthly). Each rollup deletes the finer-grained records it
//! consumed, so storage stays bounded while the journals preserve what
//! mattered. A separate extraction pass keeps the user's profile (interests,
//! personal facts) current, and the recall engine answers direct questions
//! from the journals alone.
//!
//! ## Architecture
//!
//! - **Consolidator**: turn summaries and the three rollup sweeps
//! - **FactLearner**: background interest/fact extraction into the profile
//! - **RecallEngine**: journal-grounded question answering

pub mod consolidation;
pub mod learner;
pub mod recall;

pub use consolidation::{Consolidator, RollupReport};
pub use learner::FactLearner;
pub use recall::{RecallEngine, NO_JOURNALS_REPLY};
