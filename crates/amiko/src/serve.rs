// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `amiko serve` command implementation.
//!
//! Starts the full companion: SQLite storage, Gemini provider, Telegram
//! channel, the agent loop, and the two background schedules (outreach
//! sweeps and journal rollups). Supports graceful shutdown via signal
//! handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use amiko_agent::outreach::OutreachRunner;
use amiko_agent::{shutdown, AgentLoop};
use amiko_config::AmikoConfig;
use amiko_core::{AmikoError, ChannelAdapter, ProviderAdapter, StorageAdapter};
use amiko_gemini::GeminiProvider;
use amiko_memory::{Consolidator, RollupReport};
use amiko_storage::SqliteStorage;
use amiko_telegram::TelegramChannel;

/// Runs the `amiko serve` command.
///
/// Initializes all adapters, spawns the background schedules, and enters
/// the main agent loop until a shutdown signal arrives.
pub async fn run_serve(config: AmikoConfig) -> Result<(), AmikoError> {
    // Initialize tracing subscriber.
    init_tracing(&config.agent.log_level);

    info!("starting amiko serve");

    // Initialize storage.
    let storage: Arc<dyn StorageAdapter> = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    // Initialize the Gemini provider.
    let provider: Arc<dyn ProviderAdapter> = {
        let p = GeminiProvider::new(&config.gemini).map_err(|e| {
            error!(error = %e, "failed to initialize Gemini provider");
            eprintln!(
                "error: Gemini API key required. Set gemini.api_key in amiko.toml or the GEMINI_API_KEY env var."
            );
            e
        })?;
        Arc::new(p)
    };

    // Initialize and connect the Telegram channel before sharing it.
    let channel: Arc<dyn ChannelAdapter> = {
        let mut telegram = TelegramChannel::new(&config.telegram).map_err(|e| {
            error!(error = %e, "failed to initialize Telegram channel");
            eprintln!(
                "error: Telegram bot token required. Set telegram.bot_token in amiko.toml or the AMIKO_TELEGRAM_BOT_TOKEN env var."
            );
            e
        })?;
        telegram.connect().await?;
        info!("telegram channel connected");
        Arc::new(telegram)
    };

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Spawn the outreach sweep task if enabled.
    if config.outreach.enabled {
        let runner = OutreachRunner::new(
            storage.clone(),
            provider.clone(),
            channel.clone(),
            &config,
        );
        let sweep_cancel = cancel.clone();
        let interval_secs = config.outreach.sweep_interval_secs;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match runner.run_sweep().await {
                            Ok(report) => {
                                info!(%report, "outreach sweep finished");
                            }
                            Err(e) => {
                                warn!(error = %e, "outreach sweep failed (non-fatal)");
                            }
                        }
                    }
                    _ = sweep_cancel.cancelled() => {
                        info!("outreach task shutting down");
                        break;
                    }
                }
            }
        });
        info!(interval_secs, "outreach sweeps enabled");
    } else {
        info!("outreach disabled by configuration");
    }

    // Spawn the journal rollup task if enabled.
    if config.memory.enabled {
        let consolidator = Consolidator::new(storage.clone(), provider.clone());
        let rollup_cancel = cancel.clone();
        let memory = config.memory.clone();

        tokio::spawn(async move {
            let mut daily =
                tokio::time::interval(Duration::from_secs(memory.daily_rollup_interval_secs));
            let mut weekly =
                tokio::time::interval(Duration::from_secs(memory.weekly_rollup_interval_secs));
            let mut monthly =
                tokio::time::interval(Duration::from_secs(memory.monthly_rollup_interval_secs));
            // Skip the first immediate tick on each timer.
            daily.tick().await;
            weekly.tick().await;
            monthly.tick().await;

            loop {
                tokio::select! {
                    _ = daily.tick() => {
                        log_rollup("daily", consolidator.run_daily().await);
                    }
                    _ = weekly.tick() => {
                        log_rollup("weekly", consolidator.run_weekly().await);
                    }
                    _ = monthly.tick() => {
                        log_rollup("monthly", consolidator.run_monthly().await);
                    }
                    _ = rollup_cancel.cancelled() => {
                        info!("journal rollup task shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            daily_secs = config.memory.daily_rollup_interval_secs,
            weekly_secs = config.memory.weekly_rollup_interval_secs,
            monthly_secs = config.memory.monthly_rollup_interval_secs,
            "journal rollups enabled"
        );
    } else {
        info!("memory consolidation disabled by configuration");
    }

    // Create and run the agent loop.
    let agent_loop = AgentLoop::new(channel, provider, storage, config);
    agent_loop.run(cancel).await?;

    info!("amiko serve shutdown complete");
    Ok(())
}

fn log_rollup(tier: &str, result: Result<RollupReport, AmikoError>) {
    match result {
        Ok(report) => info!(tier, %report, "journal rollup finished"),
        Err(e) => warn!(tier, error = %e, "journal rollup failed (non-fatal)"),
    }
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Every amiko crate at the configured level, dependencies at warn.
        EnvFilter::new(format!(
            "amiko={lvl},amiko_agent={lvl},amiko_memory={lvl},amiko_storage={lvl},amiko_telegram={lvl},amiko_gemini={lvl},warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
