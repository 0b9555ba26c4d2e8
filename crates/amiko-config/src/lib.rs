// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading and validation for Amiko.
//!
//! Layered loading via Figment: compiled defaults, then system and XDG
//! config files, then a local `amiko.toml`, then `AMIKO_*` environment
//! variables. After extraction the config passes semantic validation so
//! range and cross-field problems surface at startup, not mid-run.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AgentConfig, AmikoConfig, DeliveryConfig, GeminiConfig, MemoryConfig, OnboardingConfig,
    OutreachConfig, StorageConfig, TelegramConfig,
};
pub use validation::{validate_config, ConfigError};

use amiko_core::AmikoError;

/// Load configuration from the standard hierarchy and validate it.
///
/// This is the entry point used by the binary. Validation problems are
/// flattened into a single [`AmikoError::Config`] listing every violation.
pub fn load_and_validate() -> Result<AmikoConfig, AmikoError> {
    let config = load_config().map_err(|e| AmikoError::Config(e.to_string()))?;
    check(&config)?;
    Ok(config)
}

/// Load configuration from an explicit file path and validate it.
///
/// Environment variables still apply on top of the file.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<AmikoConfig, AmikoError> {
    let config = load_config_from_path(path).map_err(|e| AmikoError::Config(e.to_string()))?;
    check(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AmikoConfig, AmikoError> {
    let config = load_config_from_str(toml_content).map_err(|e| AmikoError::Config(e.to_string()))?;
    check(&config)?;
    Ok(config)
}

fn check(config: &AmikoConfig) -> Result<(), AmikoError> {
    validate_config(config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        AmikoError::Config(joined)
    })
}
