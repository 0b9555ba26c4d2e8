// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `amiko-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use amiko_core::types::{
    ChatTurn, DailyJournal, MonthlyJournal, ProfilePatch, TurnSummary, UserProfile, WeeklyJournal,
};
