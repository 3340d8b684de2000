use std::path::PathBuf;
use thiserror::Error;

/// Message shown for any failure to reach the content server. Endpoint
/// details are logged, never surfaced.
pub const SERVER_UNREACHABLE_MESSAGE: &str = "can't connect to server. You either need to:\n1. Connect to the internet\n2. Wait 30 seconds and try again";

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("{}", SERVER_UNREACHABLE_MESSAGE)]
    ServerUnreachable,

    // ── Integrity ───────────────────────────────────────
    #[error("checksum mismatch after download for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to restore protected file {path}: {reason}")]
    RestoreFailed { path: String, reason: String },

    #[error("refusing to write outside the game directory: {0}")]
    UnsafePath(String),

    // ── Resolution ──────────────────────────────────────
    #[error("version {0} not found in manifest")]
    VersionNotFound(String),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Runtime / process ───────────────────────────────
    #[error("no Java runtime available for {0}")]
    UnsupportedPlatform(String),

    #[error("failed to start game: {0}")]
    ProcessStart(String),

    #[error("Game is already running!")]
    AlreadyRunning,

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Wrap an IO error together with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LauncherError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

// Front-ends receive errors as plain strings.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
