use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::AssetIndexInfo;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Downloads the asset index and every object it references.
pub struct AssetManager<'a> {
    downloader: &'a Downloader,
    resources_url: String,
}

impl<'a> AssetManager<'a> {
    pub fn new(downloader: &'a Downloader) -> Self {
        Self {
            downloader,
            resources_url: RESOURCES_URL.to_string(),
        }
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetching the index is fatal; individual objects are best effort.
    pub async fn download_assets(
        &self,
        index_info: &AssetIndexInfo,
        assets_dir: &Path,
    ) -> LauncherResult<AssetReport> {
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", index_info.id));
        self.downloader
            .download_file(&index_info.url, &index_path, index_info.sha1.as_deref())
            .await
            .map_err(|e| LauncherError::Other(format!("assets error: {}", e)))?;

        let raw = tokio::fs::read(&index_path)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;
        let index: AssetIndex = serde_json::from_slice(&raw)?;

        let objects_dir = assets_dir.join("objects");
        let mut report = AssetReport::default();

        for (name, obj) in &index.objects {
            let Some(prefix) = obj.hash.get(..2) else {
                warn!("Asset {} has malformed hash {:?}", name, obj.hash);
                report.failed += 1;
                continue;
            };
            let dest = objects_dir.join(prefix).join(&obj.hash);
            if dest.exists() {
                report.cached += 1;
                continue;
            }

            let url = format!("{}/{}/{}", self.resources_url, prefix, obj.hash);
            match self
                .downloader
                .download_file(&url, &dest, Some(&obj.hash))
                .await
            {
                Ok(()) => report.downloaded += 1,
                Err(e) => {
                    warn!("Failed to download asset {}: {}", name, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Assets: {} downloaded, {} cached, {} failed",
            report.downloaded, report.cached, report.failed
        );
        Ok(report)
    }
}
