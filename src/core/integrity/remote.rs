// ─── Remote Content Source ───
// Fetches the server manifest and individual files over HTTP.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::manifest::Manifest;

/// Where manifests and file bodies come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_manifest(&self) -> LauncherResult<Manifest>;

    /// Download `relative_path` into `dest`, creating parent directories.
    async fn fetch_file(&self, relative_path: &str, dest: &Path) -> LauncherResult<()>;
}

/// Retry schedule for the manifest request. Only transport errors are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

pub struct RemoteManifestFetcher {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RemoteManifestFetcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn manifest_url(&self) -> String {
        format!("{}/manifest.json", self.base_url)
    }

    fn file_url(&self, relative_path: &str) -> String {
        format!(
            "{}/files/{}",
            self.base_url,
            relative_path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ContentSource for RemoteManifestFetcher {
    async fn fetch_manifest(&self) -> LauncherResult<Manifest> {
        let url = self.manifest_url();
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;

        let response = loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(resp) => break resp,
                Err(e) if attempt < attempts => {
                    warn!(
                        "Manifest request failed (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    warn!("Manifest request failed after {} attempts: {}", attempts, e);
                    return Err(e.into());
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }

        let manifest: Manifest = response.json().await?;
        debug!(
            "Server manifest v{} with {} files",
            manifest.version,
            manifest.files.len()
        );
        Ok(manifest)
    }

    async fn fetch_file(&self, relative_path: &str, dest: &Path) -> LauncherResult<()> {
        let url = self.file_url(relative_path);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
        }
        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;

        debug!("Fetched {} -> {:?}", url, dest);
        Ok(())
    }
}
