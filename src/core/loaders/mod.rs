pub mod context;
pub mod fabric;
pub mod installer;

pub use context::InstallContext;
pub use fabric::{resolve_loader_meta, FabricInstaller, LoaderDescriptor, LEGACY_FABRIC_META_URL};
pub use installer::{LoaderInstallResult, LoaderInstaller};
