// ─── Integrity Reconciler ───
// Brings the game directory in line with the server manifest:
//   1. fetch remote manifest (fatal if unreachable)
//   2. delete files the server no longer lists
//   3. download missing or modified files, honoring user-owned records
//   4. persist the remote manifest as the new local one

use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

use super::checksum::sha256_file;
use super::manifest::{Manifest, ManifestRecord, LOCAL_MANIFEST};
use super::remote::ContentSource;

/// What a reconciliation pass changed on disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub downloaded: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: usize,
}

pub async fn check_and_update(
    game_dir: &Path,
    source: &dyn ContentSource,
    events: &dyn EventSink,
) -> LauncherResult<ReconcileReport> {
    tokio::fs::create_dir_all(game_dir)
        .await
        .map_err(|e| LauncherError::io(game_dir, e))?;

    events.status("Checking for updates...");
    let remote = match source.fetch_manifest().await {
        Ok(m) => m,
        Err(e) => {
            warn!("Could not fetch server manifest: {}", e);
            return Err(LauncherError::ServerUnreachable);
        }
    };

    let local_path = game_dir.join(LOCAL_MANIFEST);
    let local = match Manifest::load_optional(&local_path).await {
        Ok(m) => m,
        Err(e) => {
            warn!("Ignoring unreadable local manifest: {}", e);
            None
        }
    };

    let local_version = local.as_ref().map(|m| m.version).unwrap_or(0);
    events.status(&format!(
        "Local Version: {}, Server Version: {}",
        local_version, remote.version
    ));
    info!(
        "Reconciling game dir {:?} (local v{}, server v{})",
        game_dir, local_version, remote.version
    );

    let mut report = ReconcileReport::default();

    if let Some(local) = &local {
        remove_obsolete(game_dir, local, &remote, events, &mut report).await;
    }

    let total = remote.files.len();
    for (i, record) in remote.files.iter().enumerate() {
        let dest = record.local_path(game_dir)?;

        if !needs_download(record, &dest).await {
            report.skipped += 1;
            continue;
        }

        events.status(&format!("Downloading [{}/{}]: {}", i + 1, total, record.path));
        download_verified(source, record, &dest).await?;
        report.downloaded.push(record.path.clone());
    }

    remote.save(&local_path).await.map_err(|e| {
        warn!("failed to save local manifest: {}", e);
        e
    })?;

    events.status("Integrity verified & up to date.");
    info!(
        "Reconciliation done: {} downloaded, {} removed, {} unchanged",
        report.downloaded.len(),
        report.removed.len(),
        report.skipped
    );
    Ok(report)
}

async fn remove_obsolete(
    game_dir: &Path,
    local: &Manifest,
    remote: &Manifest,
    events: &dyn EventSink,
    report: &mut ReconcileReport,
) {
    for record in &local.files {
        if remote.contains(&record.path) {
            continue;
        }

        let path = match record.local_path(game_dir) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping obsolete entry: {}", e);
                continue;
            }
        };

        events.status(&format!("Removing obsolete file: {}", record.path));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.removed.push(record.path.clone()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.removed.push(record.path.clone());
            }
            Err(e) => warn!("Could not remove {:?}: {}", path, e),
        }
    }
}

async fn needs_download(record: &ManifestRecord, dest: &Path) -> bool {
    if !dest.exists() {
        return true;
    }
    if !record.override_local {
        debug!("Keeping user-owned file {}", record.path);
        return false;
    }
    match sha256_file(dest).await {
        Ok(actual) => !actual.eq_ignore_ascii_case(&record.checksum),
        Err(_) => true,
    }
}

async fn download_verified(
    source: &dyn ContentSource,
    record: &ManifestRecord,
    dest: &Path,
) -> LauncherResult<()> {
    source.fetch_file(&record.path, dest).await.map_err(|e| {
        warn!("server download failed for {}: {}", record.path, e);
        e
    })?;

    let actual = sha256_file(dest).await?;
    if !actual.eq_ignore_ascii_case(&record.checksum) {
        return Err(LauncherError::ChecksumMismatch {
            path: record.path.clone(),
            expected: record.checksum.clone(),
            actual,
        });
    }
    Ok(())
}
