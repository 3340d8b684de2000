// ─── Classpath & Natives ───
// Downloads applicable libraries, unpacks their native classifiers and
// assembles the final classpath.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{LibrarySpec, PackageDescriptor};

pub fn libraries_dir(game_dir: &Path) -> PathBuf {
    game_dir.join("libraries")
}

pub fn natives_dir(game_dir: &Path) -> PathBuf {
    game_dir.join("natives")
}

pub fn client_jar_path(game_dir: &Path, version_id: &str) -> PathBuf {
    game_dir
        .join("versions")
        .join(version_id)
        .join(format!("{}.jar", version_id))
}

/// Fetch every applicable library and unpack natives into `natives_dir`.
///
/// Returns the library jars that ended up on disk, in descriptor order.
/// Individual failures are logged and the entry is left out.
pub async fn fetch_libraries(
    descriptor: &PackageDescriptor,
    game_dir: &Path,
    downloader: &Downloader,
) -> LauncherResult<Vec<PathBuf>> {
    let libs_dir = libraries_dir(game_dir);
    let natives = natives_dir(game_dir);
    tokio::fs::create_dir_all(&natives)
        .await
        .map_err(|e| LauncherError::io(&natives, e))?;

    let mut jars = Vec::new();
    for lib in &descriptor.libraries {
        if !lib.is_allowed_for_current_os() {
            debug!("Skipping library (OS rule): {}", lib.name);
            continue;
        }

        if let Some(artifact) = lib.main_artifact() {
            let dest = libs_dir.join(&artifact.path);
            match downloader
                .ensure_file(&artifact.url, &dest, artifact.sha1.as_deref())
                .await
            {
                Ok(_) => jars.push(dest),
                Err(e) => warn!("Failed to download library {}: {}", lib.name, e),
            }
        }

        if let Err(e) = fetch_natives(lib, &libs_dir, &natives, downloader).await {
            warn!("Failed to prepare natives for {}: {}", lib.name, e);
        }
    }

    info!(
        "Prepared {} library jars from {} declared",
        jars.len(),
        descriptor.libraries.len()
    );
    Ok(jars)
}

async fn fetch_natives(
    lib: &LibrarySpec,
    libs_dir: &Path,
    natives: &Path,
    downloader: &Downloader,
) -> LauncherResult<()> {
    let Some(classifier) = lib.native_classifier_for_current_os() else {
        return Ok(());
    };
    let Some(artifact) = lib.classifier_artifact(&classifier) else {
        return Ok(());
    };

    let jar = libs_dir.join(&artifact.path);
    downloader
        .ensure_file(&artifact.url, &jar, artifact.sha1.as_deref())
        .await?;
    extract_natives(&jar, natives).await
}

/// Unpack every file entry of `jar` outside `META-INF` into `natives`.
pub async fn extract_natives(jar: &Path, natives: &Path) -> LauncherResult<()> {
    let jar = jar.to_path_buf();
    let dest_dir = natives.to_path_buf();

    tokio::task::spawn_blocking(move || -> LauncherResult<()> {
        let file = std::fs::File::open(&jar).map_err(|e| LauncherError::io(&jar, e))?;
        let mut archive = zip::ZipArchive::new(file)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() || entry.name().contains("META-INF") {
                continue;
            }
            let Some(rel) = entry.enclosed_name() else {
                continue;
            };

            let dest = dest_dir.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
            }
            let mut out = std::fs::File::create(&dest).map_err(|e| LauncherError::io(&dest, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&dest, e))?;
            debug!("Extracted native: {:?}", dest);
        }
        Ok(())
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
}

/// The client jar is required; any failure aborts the launch.
pub async fn fetch_client_jar(
    descriptor: &PackageDescriptor,
    game_dir: &Path,
    downloader: &Downloader,
) -> LauncherResult<PathBuf> {
    let download = descriptor.client_download().ok_or_else(|| {
        LauncherError::Other(format!("version {} has no client download", descriptor.id))
    })?;
    let dest = client_jar_path(game_dir, &descriptor.id);
    downloader
        .ensure_file(&download.url, &dest, Some(&download.sha1))
        .await?;
    Ok(dest)
}

/// Loader libraries first, then vanilla libraries, then the client jar.
pub fn assemble_classpath(
    loader_libs: &[PathBuf],
    libraries: &[PathBuf],
    client_jar: &Path,
) -> Vec<PathBuf> {
    let mut entries = Vec::with_capacity(loader_libs.len() + libraries.len() + 1);
    entries.extend_from_slice(loader_libs);
    entries.extend_from_slice(libraries);
    entries.push(client_jar.to_path_buf());
    entries
}

pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| safe_path_str(p))
        .collect::<Vec<_>>()
        .join(get_classpath_separator())
}

/// Absolute path as a string, without the `\\?\` prefix on Windows.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java rejects extended-length paths on the classpath.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use reqwest::Client;

    use super::*;
    use crate::core::test_support::{ok, serve};
    use crate::core::version::current_os_name;

    fn native_jar() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            writer.start_file("META-INF/MANIFEST.MF", opts).unwrap();
            writer.write_all(b"Manifest-Version: 1.0").unwrap();
            writer.start_file("liblwjgl.so", opts).unwrap();
            writer.write_all(b"ELF").unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn classpath_order_is_loader_libraries_client() {
        let cp = assemble_classpath(
            &[PathBuf::from("/l/loader.jar")],
            &[PathBuf::from("/l/a.jar"), PathBuf::from("/l/b.jar")],
            Path::new("/v/1.8.9.jar"),
        );
        assert_eq!(
            cp,
            vec![
                PathBuf::from("/l/loader.jar"),
                PathBuf::from("/l/a.jar"),
                PathBuf::from("/l/b.jar"),
                PathBuf::from("/v/1.8.9.jar"),
            ]
        );
    }

    #[test]
    fn client_jar_lives_under_versions() {
        assert_eq!(
            client_jar_path(Path::new("/g"), "1.8.9"),
            Path::new("/g").join("versions").join("1.8.9").join("1.8.9.jar")
        );
    }

    #[tokio::test]
    async fn natives_skip_meta_inf() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("natives.jar");
        std::fs::write(&jar, native_jar()).unwrap();
        let natives = dir.path().join("natives");

        extract_natives(&jar, &natives).await.unwrap();

        assert_eq!(std::fs::read(natives.join("liblwjgl.so")).unwrap(), b"ELF");
        assert!(!natives.join("META-INF").exists());
    }

    #[tokio::test]
    async fn library_failures_are_omitted() {
        let os = current_os_name();
        let base = serve(vec![
            ok("/good.jar", "good"),
            ok("/natives.jar", native_jar()),
        ])
        .await;
        let descriptor: PackageDescriptor = serde_json::from_value(serde_json::json!({
            "id": "1.8.9",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": {"id": "1.8", "url": format!("{base}/index.json")},
            "libraries": [
                {"name": "a:good:1", "downloads": {"artifact": {"path": "a/good-1.jar", "url": format!("{base}/good.jar")}}},
                {"name": "a:gone:1", "downloads": {"artifact": {"path": "a/gone-1.jar", "url": format!("{base}/gone.jar")}}},
                {"name": "a:never:1", "rules": [{"action": "allow", "os": {"name": "no-such-os"}}],
                 "downloads": {"artifact": {"path": "a/never-1.jar", "url": format!("{base}/good.jar")}}},
                {"name": "a:natives:1", "natives": {os: "natives-${arch}"},
                 "downloads": {"classifiers": {
                     "natives-64": {"path": "a/natives-64.jar", "url": format!("{base}/natives.jar")},
                     "natives-32": {"path": "a/natives-32.jar", "url": format!("{base}/natives.jar")}
                 }}}
            ]
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(Client::new());
        let jars = fetch_libraries(&descriptor, dir.path(), &dl).await.unwrap();

        assert_eq!(jars, vec![libraries_dir(dir.path()).join("a/good-1.jar")]);
        assert!(!libraries_dir(dir.path()).join("a/never-1.jar").exists());
        assert!(natives_dir(dir.path()).join("liblwjgl.so").exists());
    }
}
