use std::path::Path;

use crate::core::downloader::Downloader;

/// Everything a loader install needs from the running launch.
pub struct InstallContext<'a> {
    pub libs_dir: &'a Path,
    pub downloader: &'a Downloader,
}
