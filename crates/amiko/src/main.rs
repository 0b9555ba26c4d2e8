// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Amiko - a proactive conversational companion.
//!
//! This is the binary entry point for the Amiko agent.

use clap::{Parser, Subcommand, ValueEnum};

mod serve;
mod sweep;

/// Amiko - a proactive conversational companion.
#[derive(Parser, Debug)]
#[command(name = "amiko", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Amiko companion server.
    Serve,
    /// Run one maintenance pass and exit.
    Sweep {
        /// Which pass to run.
        #[arg(value_enum)]
        kind: SweepKind,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// One-shot maintenance passes available via `amiko sweep`.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum SweepKind {
    /// Evaluate every profile for a proactive message.
    Outreach,
    /// Roll turn summaries up into daily journals.
    Daily,
    /// Roll daily journals up into weekly journals.
    Weekly,
    /// Roll weekly journals up into monthly journals.
    Monthly,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match amiko_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("amiko: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sweep { kind }) => sweep::run_sweep(config, kind).await,
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("amiko: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("amiko: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &amiko_config::AmikoConfig) -> Result<(), amiko_core::AmikoError> {
    print!("{}", render_config(config)?);
    Ok(())
}

/// Renders the effective configuration as TOML, with secret values masked.
fn render_config(config: &amiko_config::AmikoConfig) -> Result<String, amiko_core::AmikoError> {
    let mut shown = config.clone();
    if shown.telegram.bot_token.is_some() {
        shown.telegram.bot_token = Some("<set>".to_string());
    }
    if shown.gemini.api_key.is_some() {
        shown.gemini.api_key = Some("<set>".to_string());
    }
    if shown.onboarding.auth_key.is_some() {
        shown.onboarding.auth_key = Some("<set>".to_string());
    }

    toml::to_string_pretty(&shown)
        .map_err(|e| amiko_core::AmikoError::Internal(format!("failed to render config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config =
            amiko_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.agent.name, "amiko");
    }

    #[test]
    fn render_config_masks_secrets() {
        let config = amiko_config::load_and_validate_str(
            r#"
[telegram]
bot_token = "123:very-secret"

[gemini]
api_key = "sk-also-secret"

[onboarding]
auth_key = "sesame"
"#,
        )
        .unwrap();

        let rendered = render_config(&config).unwrap();

        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(!rendered.contains("sesame"));
        assert!(rendered.contains("<set>"));
        // Non-secret values pass through untouched.
        assert!(rendered.contains("gemini-2.5-flash"));
    }
}
