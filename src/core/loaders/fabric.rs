use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{LoaderInstallResult, LoaderInstaller};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, FABRIC_MAVEN, LEGACY_FABRIC_MAVEN};

pub const LEGACY_FABRIC_META_URL: &str = "https://meta.legacyfabric.net/v2/versions/loader/1.8.9";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderDescriptor {
    pub loader: MavenRef,
    pub intermediary: MavenRef,
    pub launcher_meta: LauncherMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MavenRef {
    pub version: String,
    pub maven: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherMeta {
    #[serde(default)]
    pub libraries: LoaderLibraries,
    pub main_class: LoaderMainClass,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoaderLibraries {
    #[serde(default)]
    pub common: Vec<FabricLibrary>,
    #[serde(default)]
    pub client: Vec<FabricLibrary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderMainClass {
    pub client: String,
    #[serde(default)]
    pub server: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FabricLibrary {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl FabricLibrary {
    /// Repository base for this library; a missing or empty url means the Fabric maven.
    pub fn repo(&self) -> &str {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(FABRIC_MAVEN)
    }
}

/// Fetch the loader variant list and return its first (default) entry.
pub async fn resolve_loader_meta(
    client: &reqwest::Client,
    url: &str,
) -> LauncherResult<LoaderDescriptor> {
    let resp = client.get(url).send().await?;

    if !resp.status().is_success() {
        return Err(LauncherError::LoaderApi(format!(
            "loader meta returned {}",
            resp.status()
        )));
    }

    let variants = resp.json::<Vec<LoaderDescriptor>>().await?;
    variants
        .into_iter()
        .next()
        .ok_or_else(|| LauncherError::LoaderApi("no loader versions found".into()))
}

pub struct FabricInstaller {
    meta: LoaderDescriptor,
    loader_repo: String,
    intermediary_repo: String,
}

impl FabricInstaller {
    pub fn new(meta: LoaderDescriptor) -> Self {
        Self {
            meta,
            loader_repo: FABRIC_MAVEN.to_string(),
            intermediary_repo: LEGACY_FABRIC_MAVEN.to_string(),
        }
    }

    pub fn with_repos(mut self, loader_repo: &str, intermediary_repo: &str) -> Self {
        self.loader_repo = loader_repo.to_string();
        self.intermediary_repo = intermediary_repo.to_string();
        self
    }

    /// Common then client libraries. Malformed coordinates and failed
    /// downloads are left off the classpath.
    async fn install_bulk(&self, ctx: &InstallContext<'_>) -> Vec<PathBuf> {
        let meta = &self.meta.launcher_meta.libraries;
        let mut paths = Vec::new();

        for lib in meta.common.iter().chain(meta.client.iter()) {
            let artifact = match MavenArtifact::parse(&lib.name) {
                Ok(a) => a,
                Err(_) => {
                    debug!("Skipping invalid loader library: {}", lib.name);
                    continue;
                }
            };
            let repo = lib.repo();

            match fetch_artifact(ctx, &artifact, repo).await {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Failed to download loader library {}: {}", lib.name, e),
            }
        }

        paths
    }

    /// A single required jar: any failure aborts the install.
    async fn install_required(
        &self,
        ctx: &InstallContext<'_>,
        coordinate: &str,
        repo: &str,
    ) -> LauncherResult<PathBuf> {
        let artifact = MavenArtifact::parse(coordinate)?;
        fetch_artifact(ctx, &artifact, repo).await
    }
}

async fn fetch_artifact(
    ctx: &InstallContext<'_>,
    artifact: &MavenArtifact,
    repo: &str,
) -> LauncherResult<PathBuf> {
    let dest = ctx.libs_dir.join(artifact.local_path());
    if ctx
        .downloader
        .ensure_file(&artifact.url(repo), &dest, None)
        .await?
    {
        debug!("Downloaded loader artifact {}", artifact);
    }
    Ok(dest)
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        info!(
            "Installing Legacy Fabric loader {} (intermediary {})",
            self.meta.loader.version, self.meta.intermediary.version
        );

        let mut libraries = self.install_bulk(&ctx).await;

        let intermediary = self
            .install_required(&ctx, &self.meta.intermediary.maven, &self.intermediary_repo)
            .await?;
        libraries.push(intermediary);

        let loader = self
            .install_required(&ctx, &self.meta.loader.maven, &self.loader_repo)
            .await?;
        libraries.push(loader);

        Ok(LoaderInstallResult {
            main_class: self.meta.launcher_meta.main_class.client.clone(),
            libraries,
        })
    }
}
