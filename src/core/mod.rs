// ─── Craft Launcher Core ───
// Update and launch engine for a fixed-version game client.
//
// Architecture:
//   core/
//     integrity/   Manifest sync, protected-file restore
//     version/     Version catalog + package descriptor + OS rules
//     maven/       Coordinate parsing for loader artifacts
//     downloader/  Sequential downloads with SHA-1 validation
//     assets/      Asset index + object downloads
//     loaders/     Legacy Fabric
//     java/        Bundled Zulu 8 runtime
//     launch/      Classpath, platform patches, process spawn, pipeline
//     state/       Settings, process slot, system info

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod integrity;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod state;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
