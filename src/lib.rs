pub mod commands;
pub mod core;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::core::events::{ChannelSink, LauncherEvent};
use crate::core::state::AppState;

/// Headless front-end: launches with the saved settings, prints status
/// updates and waits for the game to exit. Ctrl-C force-stops the game.
pub async fn run() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,craft_launcher_lib=debug")),
        )
        .init();

    tracing::info!("Craft launcher starting...");

    let state = match AppState::new() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize launcher: {}", e);
            return;
        }
    };

    let (sink, mut rx) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                LauncherEvent::Status(status) => println!("[status] {}", status),
                // Game output is already echoed to stdout by the launch task.
                LauncherEvent::Log(line) => tracing::trace!("{}", line.trim_end()),
            }
        }
    });

    let settings = state.launcher_settings.clone();
    let launched = commands::start_launch(
        state.clone(),
        Arc::new(sink),
        settings.username,
        settings.ram_mb,
        settings.use_fabric,
    )
    .await;

    match launched {
        Ok(mut worker) => {
            tokio::select! {
                result = &mut worker => log_outcome(result),
                _ = tokio::signal::ctrl_c() => {
                    println!("{}", commands::force_stop_game(&state).await);
                    log_outcome(worker.await);
                }
            }
        }
        Err(message) => tracing::error!("{}", message),
    }

    // The state holds no sink, so dropping the last sender closes the printer.
    let _ = printer.await;
}

fn log_outcome(
    result: Result<
        crate::core::error::LauncherResult<crate::core::launch::LaunchStage>,
        tokio::task::JoinError,
    >,
) {
    match result {
        Ok(Ok(stage)) => tracing::info!("Game finished: {:?}", stage),
        Ok(Err(e)) => tracing::error!("Launch failed: {}", e),
        Err(e) => tracing::error!("Launch worker panicked: {}", e),
    }
}
