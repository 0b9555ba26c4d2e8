// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic validation for loaded configuration.
//!
//! Checks value ranges and cross-field constraints that serde cannot
//! express. All violations are collected so the operator sees every
//! problem in one pass rather than fixing them one at a time.

use thiserror::Error;

use crate::model::AmikoConfig;

/// A single configuration validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its permitted range or form.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Two fields contradict each other.
    #[error("conflicting settings: {reason}")]
    Conflict { reason: String },
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a loaded configuration, collecting every violation.
pub fn validate_config(config: &AmikoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::InvalidValue {
            field: "agent.log_level".into(),
            reason: format!(
                "`{}` is not one of trace, debug, info, warn, error",
                config.agent.log_level
            ),
        });
    }

    if config.agent.placeholder_name.trim().is_empty() {
        errors.push(ConfigError::InvalidValue {
            field: "agent.placeholder_name".into(),
            reason: "must not be empty".into(),
        });
    }

    if let Some(token) = &config.telegram.bot_token {
        if token.trim().is_empty() {
            errors.push(ConfigError::InvalidValue {
                field: "telegram.bot_token".into(),
                reason: "must not be empty when set".into(),
            });
        }
    }

    if let Some(key) = &config.gemini.api_key {
        if key.trim().is_empty() {
            errors.push(ConfigError::InvalidValue {
                field: "gemini.api_key".into(),
                reason: "must not be empty when set".into(),
            });
        }
    }

    if config.gemini.max_tokens == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "gemini.max_tokens".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::InvalidValue {
            field: "storage.database_path".into(),
            reason: "must not be empty".into(),
        });
    }

    if config.delivery.max_fragment_chars == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "delivery.max_fragment_chars".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.delivery.min_delay_ms > config.delivery.max_delay_ms {
        errors.push(ConfigError::Conflict {
            reason: format!(
                "delivery.min_delay_ms ({}) exceeds delivery.max_delay_ms ({})",
                config.delivery.min_delay_ms, config.delivery.max_delay_ms
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.outreach.followup_probability) {
        errors.push(ConfigError::InvalidValue {
            field: "outreach.followup_probability".into(),
            reason: format!(
                "{} is outside the range 0.0 to 1.0",
                config.outreach.followup_probability
            ),
        });
    }

    if config.outreach.sweep_interval_secs == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "outreach.sweep_interval_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.outreach.followup_center_minutes <= 0 {
        errors.push(ConfigError::InvalidValue {
            field: "outreach.followup_center_minutes".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.outreach.followup_tolerance_minutes < 0 {
        errors.push(ConfigError::InvalidValue {
            field: "outreach.followup_tolerance_minutes".into(),
            reason: "must not be negative".into(),
        });
    }

    if config.outreach.followup_history_depth == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "outreach.followup_history_depth".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.memory.recall_history_depth == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "memory.recall_history_depth".into(),
            reason: "must be greater than zero".into(),
        });
    }

    for (field, value) in [
        (
            "memory.daily_rollup_interval_secs",
            config.memory.daily_rollup_interval_secs,
        ),
        (
            "memory.weekly_rollup_interval_secs",
            config.memory.weekly_rollup_interval_secs,
        ),
        (
            "memory.monthly_rollup_interval_secs",
            config.memory.monthly_rollup_interval_secs,
        ),
    ] {
        if value == 0 {
            errors.push(ConfigError::InvalidValue {
                field: field.into(),
                reason: "must be greater than zero".into(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AmikoConfig;

    #[test]
    fn default_config_validates() {
        let config = AmikoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_log_level_rejected() {
        let mut config = AmikoConfig::default();
        config.agent.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("agent.log_level"));
    }

    #[test]
    fn inverted_delay_range_rejected() {
        let mut config = AmikoConfig::default();
        config.delivery.min_delay_ms = 5000;
        config.delivery.max_delay_ms = 1000;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("min_delay_ms")));
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let mut config = AmikoConfig::default();
        config.outreach.followup_probability = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("followup_probability")));
    }

    #[test]
    fn empty_token_rejected_when_set() {
        let mut config = AmikoConfig::default();
        config.telegram.bot_token = Some("  ".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("bot_token")));
    }

    #[test]
    fn multiple_errors_collected() {
        let mut config = AmikoConfig::default();
        config.agent.log_level = "loud".into();
        config.gemini.max_tokens = 0;
        config.outreach.followup_probability = -0.1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
