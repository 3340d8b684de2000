// Embeds everything under `bundled/` into the binary so the launcher can
// restore tampered client files without a network round-trip.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const BUNDLED_DIR: &str = "bundled";

/// Paths the player is expected to change. Matched exactly or as a directory prefix.
const USER_OWNED: &[&str] = &[
    "options.txt",
    "optionsof.txt",
    "optionsshaders.txt",
    "usercache.json",
    "logs",
    "crash-reports",
    "saves",
    "resourcepacks",
    "screenshots",
    "shaderpacks",
    "versions",
    "assets",
    "libraries",
    "natives",
    "launcher_profiles.json",
];

const OS_JUNK: &[&str] = &[".DS_Store", "Thumbs.db", ".AppleDouble", ".LSOverride"];

fn main() {
    println!("cargo:rerun-if-changed={}", BUNDLED_DIR);
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let root = manifest_dir.join(BUNDLED_DIR);

    let mut files = Vec::new();
    if root.is_dir() {
        collect(&root, &root, &mut files);
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut generated = String::from("pub static PROTECTED_FILES: &[ProtectedFile] = &[\n");
    for (relative, absolute) in &files {
        let bytes = fs::read(absolute).unwrap();
        let checksum = hex::encode(Sha256::digest(&bytes));
        println!("cargo:rerun-if-changed={}", absolute.display());
        writeln!(
            generated,
            "    ProtectedFile {{ relative_path: {:?}, checksum: {:?}, content: include_bytes!({:?}) }},",
            relative,
            checksum,
            absolute.display().to_string(),
        )
        .unwrap();
    }
    generated.push_str("];\n");

    fs::write(out_dir.join("protected_files.rs"), generated).unwrap();
}

fn collect(root: &Path, dir: &Path, files: &mut Vec<(String, PathBuf)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name == ".git" || is_os_junk(&name) {
            continue;
        }

        if path.is_dir() {
            collect(root, &path, files);
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        if relative == "README.txt" || is_user_owned(&relative) {
            continue;
        }

        files.push((relative, path));
    }
}

fn is_os_junk(name: &str) -> bool {
    OS_JUNK.contains(&name) || name.starts_with("._")
}

fn is_user_owned(relative: &str) -> bool {
    USER_OWNED
        .iter()
        .any(|p| relative == *p || relative.starts_with(&format!("{}/", p)))
}
