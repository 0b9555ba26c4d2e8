// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Amiko companion backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Amiko configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AmikoConfig {
    /// Agent identity and persona settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Onboarding chain settings.
    #[serde(default)]
    pub onboarding: OnboardingConfig,

    /// Paced message delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Proactive outreach sweep settings.
    #[serde(default)]
    pub outreach: OutreachConfig,

    /// Memory consolidation settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Agent identity and persona configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the companion.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Persona system instruction for chat replies. `None` uses the
    /// built-in default persona.
    #[serde(default)]
    pub persona: Option<String>,

    /// Fallback first name used in check-in messages when the profile has
    /// no usable display name.
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            persona: None,
            placeholder_name: default_placeholder_name(),
        }
    }
}

fn default_agent_name() -> String {
    "amiko".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_placeholder_name() -> String {
    "Friend".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables Telegram integration.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` falls back to the `GEMINI_API_KEY`
    /// environment variable at provider startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier for all completion requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("amiko").join("amiko.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("amiko.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Onboarding chain configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OnboardingConfig {
    /// Shared secret gating onboarding. `None` skips the auth-key question
    /// and starts the chain at the timezone question.
    #[serde(default)]
    pub auth_key: Option<String>,
}

/// Paced message delivery configuration.
///
/// Controls how a single reply is fragmented and how long the sender pauses
/// between fragments to emulate human typing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Hard cap on a single fragment's length in characters; longer
    /// fragments are word-wrapped.
    #[serde(default = "default_max_fragment_chars")]
    pub max_fragment_chars: usize,

    /// Per-word typing pause in milliseconds.
    #[serde(default = "default_per_word_delay_ms")]
    pub per_word_delay_ms: u64,

    /// Lower bound of the random inter-fragment pause in milliseconds.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random inter-fragment pause in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_fragment_chars: default_max_fragment_chars(),
            per_word_delay_ms: default_per_word_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_fragment_chars() -> usize {
    140
}

fn default_per_word_delay_ms() -> u64 {
    250
}

fn default_min_delay_ms() -> u64 {
    1500
}

fn default_max_delay_ms() -> u64 {
    3500
}

/// Proactive outreach sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutreachConfig {
    /// Enable the periodic outreach sweep inside `serve`. One-shot sweeps
    /// via the CLI work regardless.
    #[serde(default = "default_outreach_enabled")]
    pub enabled: bool,

    /// Outreach sweep interval in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Probability that a qualified timed follow-up is actually sent.
    #[serde(default = "default_followup_probability")]
    pub followup_probability: f64,

    /// Center of the follow-up eligibility window, in minutes after the
    /// companion's last message.
    #[serde(default = "default_followup_center_minutes")]
    pub followup_center_minutes: i64,

    /// Widens the upper bound of the follow-up window, in minutes.
    #[serde(default = "default_followup_tolerance_minutes")]
    pub followup_tolerance_minutes: i64,

    /// Number of recent turns used to build the follow-up message.
    #[serde(default = "default_followup_history_depth")]
    pub followup_history_depth: usize,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            enabled: default_outreach_enabled(),
            sweep_interval_secs: default_sweep_interval_secs(),
            followup_probability: default_followup_probability(),
            followup_center_minutes: default_followup_center_minutes(),
            followup_tolerance_minutes: default_followup_tolerance_minutes(),
            followup_history_depth: default_followup_history_depth(),
        }
    }
}

fn default_outreach_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    900 // 15 minutes
}

fn default_followup_probability() -> f64 {
    0.4
}

fn default_followup_center_minutes() -> i64 {
    10
}

fn default_followup_tolerance_minutes() -> i64 {
    5
}

fn default_followup_history_depth() -> usize {
    6
}

/// Memory consolidation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the periodic rollup timers inside `serve`. One-shot rollups
    /// via the CLI work regardless.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Daily rollup interval in seconds.
    #[serde(default = "default_daily_rollup_interval_secs")]
    pub daily_rollup_interval_secs: u64,

    /// Weekly rollup interval in seconds.
    #[serde(default = "default_weekly_rollup_interval_secs")]
    pub weekly_rollup_interval_secs: u64,

    /// Monthly rollup interval in seconds.
    #[serde(default = "default_monthly_rollup_interval_secs")]
    pub monthly_rollup_interval_secs: u64,

    /// Number of recent turns placed behind the journal blob on recall.
    #[serde(default = "default_recall_history_depth")]
    pub recall_history_depth: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            daily_rollup_interval_secs: default_daily_rollup_interval_secs(),
            weekly_rollup_interval_secs: default_weekly_rollup_interval_secs(),
            monthly_rollup_interval_secs: default_monthly_rollup_interval_secs(),
            recall_history_depth: default_recall_history_depth(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_daily_rollup_interval_secs() -> u64 {
    86_400 // 24 hours
}

fn default_weekly_rollup_interval_secs() -> u64 {
    604_800 // 7 days
}

fn default_monthly_rollup_interval_secs() -> u64 {
    2_678_400 // 31 days
}

fn default_recall_history_depth() -> usize {
    10
}
