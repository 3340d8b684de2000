// ─── Java Runtime ───
// Finds or installs the bundled Zulu 8 runtime inside the game directory,
// falling back to whatever `java` is on PATH.

use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

const ZULU_BASE_URL: &str = "https://cdn.azul.com/zulu/bin/zulu8.78.0.19-ca-jdk8.0.412-";
const INSTALL_TEMP: &str = "java_install.tmp";
const INSTALL_STAGING: &str = ".jre-staging";

/// One downloadable runtime archive, keyed by `std::env::consts` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JreSource {
    pub os: &'static str,
    pub arch: &'static str,
    pub archive: &'static str,
}

#[rustfmt::skip]
pub const JRE_TABLE: &[JreSource] = &[
    JreSource { os: "macos", arch: "aarch64", archive: "macosx_aarch64.tar.gz" },
    JreSource { os: "macos", arch: "x86_64", archive: "macosx_x64.tar.gz" },
    JreSource { os: "windows", arch: "x86_64", archive: "win_x64.zip" },
    JreSource { os: "windows", arch: "x86", archive: "win_i686.zip" },
    JreSource { os: "windows", arch: "aarch64", archive: "win_aarch64.zip" },
    JreSource { os: "linux", arch: "x86_64", archive: "linux_x64.tar.gz" },
];

impl JreSource {
    pub fn url(&self) -> String {
        format!("{}{}", ZULU_BASE_URL, self.archive)
    }
}

pub fn jre_source(os: &str, arch: &str) -> Option<&'static JreSource> {
    JRE_TABLE.iter().find(|s| s.os == os && s.arch == arch)
}

/// Canonical install location for the current platform.
pub fn runtime_dir(game_dir: &Path) -> PathBuf {
    game_dir.join(format!(
        "jre-{}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ))
}

/// Executable names in preference order.
fn java_exe_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["javaw.exe", "java.exe"]
    } else {
        &["java"]
    }
}

/// Look through the known archive layouts, then search anything under a `bin` directory.
pub fn locate_java_binary(runtime_root: &Path) -> Option<PathBuf> {
    let layouts = [
        runtime_root.join("bin"),
        runtime_root.join("Contents").join("Home").join("bin"),
        runtime_root
            .join("zulu-8.jdk")
            .join("Contents")
            .join("Home")
            .join("bin"),
    ];

    for exe in java_exe_names() {
        for dir in &layouts {
            let candidate = dir.join(exe);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    find_java_binary_recursive(runtime_root)
}

fn find_java_binary_recursive(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut dirs = Vec::new();

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_file() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let under_bin = path
                .parent()
                .map(|p| p.to_string_lossy().contains("bin"))
                .unwrap_or(false);
            if under_bin && java_exe_names().contains(&name) {
                return Some(path);
            }
        } else if file_type.is_dir() {
            dirs.push(path);
        }
    }

    dirs.iter().find_map(|d| find_java_binary_recursive(d))
}

/// Return the runtime to launch with. Never fails: problems degrade to PATH `java`.
pub async fn resolve_java(
    game_dir: &Path,
    downloader: &Downloader,
    events: &dyn EventSink,
) -> PathBuf {
    match ensure_java(game_dir, downloader).await {
        Ok(path) => path,
        Err(e) => {
            warn!("Java runtime unavailable, falling back to PATH: {}", e);
            let msg = format!("Warning: Java download failed ({}). Trying system Java...", e);
            events.status(&msg);
            events.log(&msg);
            PathBuf::from("java")
        }
    }
}

pub async fn ensure_java(game_dir: &Path, downloader: &Downloader) -> LauncherResult<PathBuf> {
    let root = runtime_dir(game_dir);
    if let Some(found) = locate_java_binary(&root) {
        return Ok(found);
    }

    let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);
    let source = jre_source(os, arch)
        .ok_or_else(|| LauncherError::UnsupportedPlatform(format!("{}-{}", os, arch)))?;

    install_from(&source.url(), game_dir, &root, downloader).await
}

/// Download an archive, unpack it and move its top-level JDK directory to `root`.
async fn install_from(
    url: &str,
    game_dir: &Path,
    root: &Path,
    downloader: &Downloader,
) -> LauncherResult<PathBuf> {
    info!("Downloading Java runtime from {}", url);
    let archive = game_dir.join(INSTALL_TEMP);
    let staging = game_dir.join(INSTALL_STAGING);

    downloader.download_file(url, &archive, None).await?;

    if staging.exists() {
        tokio::fs::remove_dir_all(&staging)
            .await
            .map_err(|e| LauncherError::io(&staging, e))?;
    }

    let is_zip = url.ends_with(".zip");
    let (archive_c, staging_c) = (archive.clone(), staging.clone());
    let extracted = tokio::task::spawn_blocking(move || {
        if is_zip {
            extract_zip(&archive_c, &staging_c)
        } else {
            extract_tar_gz(&archive_c, &staging_c)
        }
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?;
    let _ = tokio::fs::remove_file(&archive).await;
    extracted?;

    let top = find_jdk_dir(&staging).ok_or_else(|| {
        LauncherError::Other("downloaded archive has no JDK directory".into())
    })?;
    if root.exists() {
        tokio::fs::remove_dir_all(root)
            .await
            .map_err(|e| LauncherError::io(root, e))?;
    }
    tokio::fs::rename(&top, root)
        .await
        .map_err(|e| LauncherError::io(root, e))?;
    let _ = tokio::fs::remove_dir_all(&staging).await;

    let java = locate_java_binary(root).ok_or_else(|| {
        LauncherError::Other(format!("no java executable inside {:?}", root))
    })?;
    make_executable(&java)?;

    info!("Java runtime installed at {:?}", java);
    Ok(java)
}

fn find_jdk_dir(staging: &Path) -> Option<PathBuf> {
    std::fs::read_dir(staging)
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .find(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            name.contains("zulu") || name.contains("jdk")
        })
        .map(|e| e.path())
}

fn make_executable(path: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| LauncherError::io(path, e))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(|e| LauncherError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

pub fn extract_zip(zip_path: &Path, dest: &Path) -> LauncherResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| LauncherError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let Some(rel_path) = zipped.enclosed_name() else {
            warn!("Skipping unsafe zip entry {}", zipped.name());
            continue;
        };
        let out_path = dest.join(rel_path);

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = zipped.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(())
}

pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> LauncherResult<()> {
    let file =
        std::fs::File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest)
        .map_err(|e| LauncherError::io(dest, e))
}
