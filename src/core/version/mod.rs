pub mod manifest;
pub mod version_file;

pub use manifest::{resolve_version, VersionEntry, VersionManifest, VERSION_MANIFEST_URL};
pub use version_file::{
    current_os_name, AssetIndexInfo, DownloadArtifact, LibDownloadArtifact, LibraryDownloads,
    LibraryRule, LibrarySpec, OsRule, PackageDescriptor, RuleAction, VersionDownloads,
};
