// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading via figment.
//!
//! A local `./amiko.toml` wins over the user XDG file, which wins over
//! `/etc/amiko/amiko.toml`; `AMIKO_`-prefixed environment variables override
//! them all.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AmikoConfig;

/// Loads configuration from the standard locations.
///
/// Layers, weakest first: compiled defaults, the system-wide
/// `/etc/amiko/amiko.toml`, the user XDG `amiko/amiko.toml`, a local
/// `./amiko.toml`, and finally `AMIKO_*` environment variables.
pub fn load_config() -> Result<AmikoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AmikoConfig::default()))
        .merge(Toml::file("/etc/amiko/amiko.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("amiko/amiko.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("amiko.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AmikoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AmikoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AmikoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AmikoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `AMIKO_TELEGRAM_BOT_TOKEN`
/// must map to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("AMIKO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: AMIKO_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("gemini_", "gemini.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("onboarding_", "onboarding.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("outreach_", "outreach.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_cleanly() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "amiko");
        assert_eq!(config.delivery.max_fragment_chars, 140);
        assert_eq!(config.outreach.followup_center_minutes, 10);
        assert_eq!(config.memory.recall_history_depth, 10);
        assert!(config.onboarding.auth_key.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[agent]
name = "nova"

[delivery]
max_fragment_chars = 100

[outreach]
followup_probability = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.agent.name, "nova");
        assert_eq!(config.delivery.max_fragment_chars, 100);
        assert_eq!(config.outreach.followup_probability, 0.5);
        // Untouched sections keep their defaults.
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[agent]
naem = "typo"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_provider_maps_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("AMIKO_TELEGRAM_BOT_TOKEN", "123:abc");
            jail.set_env("AMIKO_OUTREACH_SWEEP_INTERVAL_SECS", "60");
            let config: AmikoConfig = Figment::new()
                .merge(Serialized::defaults(AmikoConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
            assert_eq!(config.outreach.sweep_interval_secs, 60);
            Ok(())
        });
    }
}
