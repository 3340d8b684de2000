// ─── Platform Patches ───
// Per-(OS, arch) native substitutions. Everything platform specific lives in
// `PLATFORM_PATCHES`; `apply` only interprets the table.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::events::EventSink;

macro_rules! m1_hack {
    ($path:literal) => {
        concat!(
            "https://raw.githubusercontent.com/GreeniusGenius/m1-prism-launcher-hack-1.8.9/master/",
            $path
        )
    };
}

/// A file fetched from `url` and stored under `file_name`.
#[derive(Debug, Clone, Copy)]
pub struct Replacement {
    pub file_name: &'static str,
    pub url: &'static str,
}

#[derive(Debug)]
pub struct PlatformPatch {
    pub os: &'static str,
    pub arch: &'static str,
    /// Written into the natives directory, replacing vanilla binaries.
    pub natives: &'static [Replacement],
    /// Written into `jar_dir` and appended to the classpath.
    pub jars: &'static [Replacement],
    pub jar_dir: &'static str,
    /// Classpath entries whose file name contains any of these are dropped.
    pub excluded_jars: &'static [&'static str],
    /// Deleted from the natives directory.
    pub removed_natives: &'static [&'static str],
}

pub const PLATFORM_PATCHES: &[PlatformPatch] = &[PlatformPatch {
    os: "macos",
    arch: "aarch64",
    natives: &[
        Replacement {
            file_name: "liblwjgl.dylib",
            url: m1_hack!("lwjglnatives/liblwjgl.dylib"),
        },
        Replacement {
            file_name: "libopenal.dylib",
            url: m1_hack!("lwjglnatives/libopenal.dylib"),
        },
    ],
    jars: &[
        Replacement {
            file_name: "lwjglfat.jar",
            url: m1_hack!("lwjglfat.jar"),
        },
        Replacement {
            file_name: "lwjgl_util.jar",
            url: m1_hack!("lwjgl_util.jar"),
        },
    ],
    jar_dir: "m1_libs",
    excluded_jars: &["lwjgl-2", "lwjgl-platform-2", "lwjgl_util-2", "twitch", "jinput"],
    removed_natives: &[
        "libjinput-osx.dylib",
        "libjinput-osx.jnilib",
        "libtwitchsdk.dylib",
        "openal.dylib",
    ],
}];

pub fn patch_for(os: &str, arch: &str) -> Option<&'static PlatformPatch> {
    PLATFORM_PATCHES
        .iter()
        .find(|p| p.os == os && p.arch == arch)
}

pub fn current_patch() -> Option<&'static PlatformPatch> {
    patch_for(std::env::consts::OS, std::env::consts::ARCH)
}

impl PlatformPatch {
    /// Download replacements, prune incompatible natives and rewrite `classpath`.
    /// Download failures are warnings; the classpath is rewritten regardless.
    pub async fn apply(
        &self,
        game_dir: &Path,
        natives_dir: &Path,
        classpath: &mut Vec<PathBuf>,
        downloader: &Downloader,
        events: &dyn EventSink,
    ) {
        info!("Applying native patches for {}-{}", self.os, self.arch);

        // Vanilla natives are re-extracted every launch, so always overwrite.
        for native in self.natives {
            let dest = natives_dir.join(native.file_name);
            if let Err(e) = downloader.download_file(native.url, &dest, None).await {
                warn_both(events, &format!("Warning: failed to patch {}: {}", native.file_name, e));
            }
        }

        let jar_dir = game_dir.join(self.jar_dir);
        for jar in self.jars {
            let dest = jar_dir.join(jar.file_name);
            if let Err(e) = downloader.ensure_file(jar.url, &dest, None).await {
                warn_both(events, &format!("Warning: failed to download {}: {}", jar.file_name, e));
            }
        }

        for name in self.removed_natives {
            let path = natives_dir.join(name);
            if path.exists() {
                info!("Removing incompatible library: {}", name);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove {:?}: {}", path, e);
                }
            }
        }

        self.rewrite_classpath(game_dir, classpath);
        events.log("Applied M1 Classpath Patches");
    }

    pub fn rewrite_classpath(&self, game_dir: &Path, classpath: &mut Vec<PathBuf>) {
        classpath.retain(|entry| {
            let name = entry
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            !self.excluded_jars.iter().any(|bad| name.contains(bad))
        });

        let jar_dir = game_dir.join(self.jar_dir);
        classpath.extend(self.jars.iter().map(|j| jar_dir.join(j.file_name)));
    }
}

fn warn_both(events: &dyn EventSink, message: &str) {
    warn!("{}", message);
    events.log(message);
}
