// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `amiko sweep` command implementation.
//!
//! Runs a single maintenance pass and exits: one outreach evaluation over
//! every profile, or one journal rollup at the chosen tier. Useful for
//! cron-style deployments and for inspecting what the background schedules
//! inside `serve` would do.

use std::sync::Arc;

use amiko_agent::outreach::OutreachRunner;
use amiko_config::AmikoConfig;
use amiko_core::{AmikoError, ChannelAdapter, ProviderAdapter, StorageAdapter};
use amiko_gemini::GeminiProvider;
use amiko_memory::Consolidator;
use amiko_storage::SqliteStorage;
use amiko_telegram::TelegramChannel;

use crate::SweepKind;

/// Runs the `amiko sweep` command.
pub async fn run_sweep(config: AmikoConfig, kind: SweepKind) -> Result<(), AmikoError> {
    crate::serve::init_tracing(&config.agent.log_level);

    let storage: Arc<dyn StorageAdapter> = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };
    let provider: Arc<dyn ProviderAdapter> = Arc::new(GeminiProvider::new(&config.gemini)?);

    let outcome = match kind {
        SweepKind::Outreach => {
            // Send-only: a one-shot sweep never needs long polling, and
            // starting it here would steal updates from a running serve.
            let telegram = TelegramChannel::new(&config.telegram)?;
            let channel: Arc<dyn ChannelAdapter> = Arc::new(telegram);
            let runner = OutreachRunner::new(storage.clone(), provider, channel, &config);
            let report = runner.run_sweep().await?;
            format!("outreach sweep: {report}")
        }
        SweepKind::Daily => {
            let consolidator = Consolidator::new(storage.clone(), provider);
            format!("daily rollup: {}", consolidator.run_daily().await?)
        }
        SweepKind::Weekly => {
            let consolidator = Consolidator::new(storage.clone(), provider);
            format!("weekly rollup: {}", consolidator.run_weekly().await?)
        }
        SweepKind::Monthly => {
            let consolidator = Consolidator::new(storage.clone(), provider);
            format!("monthly rollup: {}", consolidator.run_monthly().await?)
        }
    };

    storage.close().await?;
    println!("{outcome}");
    Ok(())
}
