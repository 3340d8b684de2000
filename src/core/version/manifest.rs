// ─── Version Manifest ───
// The global version catalog and lookup of a single package descriptor.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

use super::version_file::PackageDescriptor;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest.json";

/// Top-level version catalog.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching version manifest...");

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let manifest: VersionManifest = response.json().await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by exact ID (e.g. "1.8.9").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// Look up `version_id` in the catalog at `catalog_url` and fetch its descriptor.
/// Emits a status before each of the two requests.
pub async fn resolve_version(
    client: &reqwest::Client,
    catalog_url: &str,
    version_id: &str,
    events: &dyn EventSink,
) -> LauncherResult<PackageDescriptor> {
    events.status("Fetching Version Manifest...");
    let manifest = VersionManifest::fetch(client, catalog_url).await?;
    let entry = manifest
        .find_version(version_id)
        .ok_or_else(|| LauncherError::VersionNotFound(version_id.to_string()))?;

    events.status("Fetching Package Info...");
    PackageDescriptor::fetch(client, &entry.url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::testing::RecordingSink;
    use crate::core::test_support::{ok, serve, status};

    const DESCRIPTOR: &str = r#"{
        "id": "1.8.9",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": {"id": "1.8", "url": "https://x/1.8.json"}
    }"#;

    #[tokio::test]
    async fn resolves_descriptor_through_catalog() {
        let package = serve(vec![ok("/1.8.9.json", DESCRIPTOR)]).await;
        let catalog = format!(
            r#"{{"versions": [{{"id": "1.8.9", "type": "release", "url": "{package}/1.8.9.json"}}]}}"#
        );
        let base = serve(vec![ok("/catalog.json", catalog.as_str())]).await;
        let sink = RecordingSink::default();

        let desc = resolve_version(
            &reqwest::Client::new(),
            &format!("{base}/catalog.json"),
            "1.8.9",
            &sink,
        )
        .await
        .unwrap();

        assert_eq!(desc.main_class, "net.minecraft.client.main.Main");
        assert_eq!(
            sink.statuses(),
            vec!["Fetching Version Manifest...", "Fetching Package Info..."]
        );
    }

    #[tokio::test]
    async fn unknown_version_is_reported() {
        let base = serve(vec![ok(
            "/catalog.json",
            r#"{"versions": [{"id": "1.8.8", "type": "release", "url": "https://x/1.8.8.json"}]}"#,
        )])
        .await;
        let sink = RecordingSink::default();

        let err = resolve_version(
            &reqwest::Client::new(),
            &format!("{base}/catalog.json"),
            "1.8.9",
            &sink,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LauncherError::VersionNotFound(ref id) if id == "1.8.9"));
        assert_eq!(sink.statuses(), vec!["Fetching Version Manifest..."]);
    }

    #[tokio::test]
    async fn catalog_http_error_keeps_its_status() {
        let base = serve(vec![status("/catalog.json", 503)]).await;
        let err = resolve_version(
            &reqwest::Client::new(),
            &format!("{base}/catalog.json"),
            "1.8.9",
            &RecordingSink::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LauncherError::DownloadFailed { status: 503, .. }));
    }

    #[test]
    fn deserialize_catalog() {
        let json = r#"{
            "latest": {"release": "1.21", "snapshot": "24w01a"},
            "versions": [
                {"id": "1.8.9", "type": "release", "url": "https://example.com/1.8.9.json",
                 "time": "2019-06-28T07:05:57+00:00", "releaseTime": "2015-12-03T09:24:39+00:00"},
                {"id": "1.8.8", "type": "release", "url": "https://example.com/1.8.8.json"}
            ]
        }"#;
        let manifest: VersionManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.latest.as_ref().unwrap().release, "1.21");

        let entry = manifest.find_version("1.8.9").unwrap();
        assert_eq!(entry.version_type, "release");
        assert_eq!(
            entry.release_time.as_deref(),
            Some("2015-12-03T09:24:39+00:00")
        );
        assert!(manifest.find_version("1.8").is_none());
    }
}
