use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::loaders::LEGACY_FABRIC_META_URL;
use crate::core::version::VERSION_MANIFEST_URL;

use super::process::ProcessSlot;
use super::system_info::SystemInfo;

const APP_DIR_NAME: &str = "CraftLauncher";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// Content server baked in at build time through `LAUNCHER_SERVER_URL`.
pub const DEFAULT_SERVER_URL: &str = match option_env!("LAUNCHER_SERVER_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:8090",
};

pub const GAME_VERSION: &str = "1.8.9";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub server_url: String,
    pub version_id: String,
    pub version_catalog_url: String,
    pub loader_meta_url: String,
    pub username: String,
    pub ram_mb: u64,
    pub use_fabric: bool,
    /// Skip the bundled runtime and launch with this executable.
    pub java_path: Option<PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            version_id: GAME_VERSION.to_string(),
            version_catalog_url: VERSION_MANIFEST_URL.to_string(),
            loader_meta_url: LEGACY_FABRIC_META_URL.to_string(),
            username: "Player".to_string(),
            ram_mb: 2048,
            use_fabric: false,
            java_path: None,
        }
    }
}

/// Everything the commands share for the lifetime of the launcher.
pub struct AppState {
    pub game_dir: PathBuf,
    pub http_client: Client,
    pub downloader: Downloader,
    pub process: ProcessSlot,
    pub system: SystemInfo,
    pub launcher_settings: LauncherSettings,
}

impl AppState {
    pub fn new() -> LauncherResult<Self> {
        Self::with_game_dir(default_game_dir())
    }

    pub fn with_game_dir(game_dir: PathBuf) -> LauncherResult<Self> {
        std::fs::create_dir_all(&game_dir).map_err(|e| LauncherError::io(&game_dir, e))?;

        let http_client = build_http_client()?;
        let downloader = Downloader::new(http_client.clone());
        let launcher_settings = load_settings_from_disk(&game_dir);
        info!("Game directory: {:?}", game_dir);

        Ok(Self {
            game_dir,
            http_client,
            downloader,
            process: ProcessSlot::new(),
            system: SystemInfo::detect(),
            launcher_settings,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.game_dir.join(SETTINGS_FILE)
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        let path = self.settings_path();
        let json = serde_json::to_string_pretty(&self.launcher_settings)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings_from_disk(game_dir: &Path) -> LauncherSettings {
    let path = game_dir.join(SETTINGS_FILE);
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return LauncherSettings::default();
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Ignoring malformed {:?}: {}", path, e);
        LauncherSettings::default()
    })
}

/// `data/` next to the executable, so the launcher stays portable.
pub fn default_game_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("data")))
        .unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
                .join("data")
        })
}
