// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The workspace-wide error enum.

use thiserror::Error;

/// Error type shared by every Amiko crate.
///
/// Variants are grouped by where the failure happened rather than by cause;
/// the boxed sources carry the underlying library error when there is one.
#[derive(Debug, Error)]
pub enum AmikoError {
    /// Bad or missing configuration, reported at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The SQLite layer failed (open, migration, or query).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The messaging channel failed to connect, send, or receive.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The model provider returned an error or an unusable completion.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An adapter's health probe reported it down.
    #[error("health check failed for {name}: {reason}")]
    HealthCheckFailed { name: String, reason: String },

    /// An operation ran past its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// A bug or broken invariant; not recoverable by retrying.
    #[error("internal error: {0}")]
    Internal(String),
}
