// ─── Protected Files ───
// Client files compiled into the binary. Any copy on disk that is missing or
// differs from the embedded bytes is rewritten.

use std::path::Path;

use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::checksum::sha256_file;
use super::manifest::ManifestRecord;

#[derive(Debug, Clone, Copy)]
pub struct ProtectedFile {
    pub relative_path: &'static str,
    pub checksum: &'static str,
    pub content: &'static [u8],
}

include!(concat!(env!("OUT_DIR"), "/protected_files.rs"));

/// Check the compiled-in table against `game_dir`.
pub async fn verify_and_restore(game_dir: &Path) -> LauncherResult<Vec<String>> {
    verify_and_restore_with(game_dir, PROTECTED_FILES).await
}

/// Returns the relative paths that had to be restored.
pub async fn verify_and_restore_with(
    game_dir: &Path,
    files: &[ProtectedFile],
) -> LauncherResult<Vec<String>> {
    let mut restored = Vec::new();

    for file in files {
        let record = ManifestRecord {
            path: file.relative_path.to_string(),
            size: file.content.len() as i64,
            checksum: file.checksum.to_string(),
            override_local: true,
        };
        let dest = record.local_path(game_dir)?;

        let intact = match sha256_file(&dest).await {
            Ok(actual) => actual.eq_ignore_ascii_case(file.checksum),
            Err(_) => false,
        };
        if intact {
            continue;
        }

        warn!("Restoring protected file {}", file.relative_path);
        write_embedded(&dest, file).await?;
        restored.push(file.relative_path.to_string());
    }

    if !restored.is_empty() {
        info!("Restored {} protected files", restored.len());
    }
    Ok(restored)
}

async fn write_embedded(dest: &Path, file: &ProtectedFile) -> LauncherResult<()> {
    let fail = |e: std::io::Error| LauncherError::RestoreFailed {
        path: file.relative_path.to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }
    tokio::fs::write(dest, file.content).await.map_err(fail)
}
