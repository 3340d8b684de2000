use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::error::LauncherResult;

use super::context::InstallContext;

/// What a loader contributes to a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderInstallResult {
    pub main_class: String,
    /// Absolute jar paths, in classpath order.
    pub libraries: Vec<PathBuf>,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult>;
}
