// ─── Commands ───
// Front-end facing entry points. Each returns plain values or display
// strings so any UI bridge can forward them unchanged.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::error::LauncherResult;
use crate::core::events::SharedSink;
use crate::core::integrity::{check_and_update, verify_and_restore, RemoteManifestFetcher};
use crate::core::launch::{supervise, KillHandle, LaunchPipeline, LaunchRequest, LaunchStage};
use crate::core::state::{AppState, SlotReservation, SystemInfo};

pub type SharedState = Arc<AppState>;

pub fn get_system_info(state: &AppState) -> SystemInfo {
    state.system
}

/// Start a launch. Returns "Launching..." once the worker is running, or the
/// error text when the launch was refused or the update step failed.
pub async fn launch_game(
    state: SharedState,
    events: SharedSink,
    username: String,
    ram_mb: u64,
    use_fabric: bool,
) -> String {
    match start_launch(state, events, username, ram_mb, use_fabric).await {
        Ok(_) => "Launching...".into(),
        Err(message) => message,
    }
}

pub async fn force_stop_game(state: &AppState) -> String {
    state.process.force_stop().await
}

/// Reserve the slot, sync game content and hand off to the launch worker.
/// The returned handle resolves when the game has exited.
pub async fn start_launch(
    state: SharedState,
    events: SharedSink,
    username: String,
    ram_mb: u64,
    use_fabric: bool,
) -> Result<JoinHandle<LauncherResult<LaunchStage>>, String> {
    let reservation = state.process.try_acquire().await.map_err(|e| e.to_string())?;

    let ram_mb = state.system.clamp_ram(ram_mb);
    let settings = state.launcher_settings.clone();
    emit_platform_info(&events, &state.system, &username, ram_mb, &settings.version_id);

    let fetcher = RemoteManifestFetcher::new(state.http_client.clone(), settings.server_url.as_str());
    let synced = async {
        check_and_update(&state.game_dir, &fetcher, events.as_ref()).await?;
        verify_and_restore(&state.game_dir).await?;
        LauncherResult::Ok(())
    }
    .await;

    if let Err(e) = synced {
        let message = format!("Update Error: {}", e);
        error!("{}", message);
        events.status(&message);
        return Err(message);
    }

    let request = LaunchRequest {
        username,
        ram_mb,
        use_fabric,
        version_id: settings.version_id.clone(),
    };
    info!("Starting launch for {}...", request.username);

    Ok(tokio::spawn(run_launch_worker(state, events, reservation, request)))
}

async fn run_launch_worker(
    state: SharedState,
    events: SharedSink,
    reservation: SlotReservation,
    request: LaunchRequest,
) -> LauncherResult<LaunchStage> {
    let settings = &state.launcher_settings;
    let mut pipeline = LaunchPipeline::new(&state.game_dir, &state.downloader, events.as_ref())
        .with_java(settings.java_path.clone())
        .with_catalog_url(settings.version_catalog_url.as_str())
        .with_loader_meta_url(settings.loader_meta_url.as_str());

    let started = match pipeline.prepare(&request).await {
        Ok(plan) => pipeline.start(&plan),
        Err(e) => Err(e),
    };
    let child = match started {
        Ok(child) => child,
        Err(e) => {
            error!("Error launching: {}", e);
            events.status(&format!("Error: {}", e));
            return Err(e);
        }
    };

    let (kill, kill_rx) = KillHandle::channel();
    reservation.mark_running(child.id(), kill).await;
    events.status("Running");

    let outcome = supervise(child, events.clone(), kill_rx).await;
    match outcome {
        LaunchStage::Exited => events.status("Ready to Launch"),
        _ => {
            warn!("Game process ended as {:?}", outcome);
            events.status("Crashed");
        }
    }

    drop(reservation);
    Ok(outcome)
}

fn emit_platform_info(
    events: &SharedSink,
    system: &SystemInfo,
    username: &str,
    ram_mb: u64,
    version: &str,
) {
    let lines = [
        "=== PLATFORM INFO ===".to_string(),
        format!("OS: {}", std::env::consts::OS),
        format!("Architecture: {}", std::env::consts::ARCH),
        format!("Username: {}", username),
        format!("RAM Allocation: {} GiB ({} MiB)", ram_mb / 1024, ram_mb),
        format!(
            "System RAM: {} GiB ({} MiB)",
            system.total_ram / 1024,
            system.total_ram
        ),
        format!("Version: {}", version),
        "=====================".to_string(),
    ];
    for line in &lines {
        events.status(line);
    }
}
