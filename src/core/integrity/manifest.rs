// ─── Content Manifest ───
// The file list a server publishes and the copy we keep after a successful sync.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::core::error::{LauncherError, LauncherResult};

/// Name of the persisted local manifest inside the game directory.
pub const LOCAL_MANIFEST: &str = ".client_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub path: String,
    #[serde(default)]
    pub size: i64,
    pub checksum: String,
    /// `false` marks a user-owned file: created if missing, never replaced.
    /// Absent means `false`.
    #[serde(rename = "override", default)]
    pub override_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: i64,
    #[serde(default)]
    pub files: Vec<ManifestRecord>,
}

impl ManifestRecord {
    /// Resolve this record under `root`, rejecting absolute paths and `..`.
    pub fn local_path(&self, root: &Path) -> LauncherResult<PathBuf> {
        let rel = Path::new(&self.path);
        let mut out = root.to_path_buf();
        let mut pushed = false;

        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    out.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                _ => return Err(LauncherError::UnsafePath(self.path.clone())),
            }
        }

        if !pushed {
            return Err(LauncherError::UnsafePath(self.path.clone()));
        }
        Ok(out)
    }
}

impl Manifest {
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Like [`Manifest::load`], but a missing file is `None` instead of an error.
    pub async fn load_optional(path: &Path) -> LauncherResult<Option<Self>> {
        match Self::load(path).await {
            Ok(m) => Ok(Some(m)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write to a sibling temp file and rename it over `path`.
    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        let json = serde_json::to_vec_pretty(self)?;

        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        {
            let mut file = tokio::fs::File::create(&tmp)
                .await
                .map_err(|e| LauncherError::io(&tmp, e))?;
            file.write_all(&json)
                .await
                .map_err(|e| LauncherError::io(&tmp, e))?;
            file.sync_all()
                .await
                .map_err(|e| LauncherError::io(&tmp, e))?;
        }

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LauncherError::io(path, e));
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&ManifestRecord> {
        self.files.iter().find(|r| r.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}
