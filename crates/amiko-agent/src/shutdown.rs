// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal-driven shutdown.
//!
//! One [`CancellationToken`] fans out to the agent loop and both background
//! schedules; cancelling it is the only shutdown mechanism.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawns a task that cancels the returned token on SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        info!(signal = signal_name, "shutdown signal received");
        trigger.cancel();
    });

    token
}

/// Blocks until a termination signal arrives, returning its name for logs.
async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
