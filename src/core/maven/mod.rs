mod artifact;

pub use artifact::MavenArtifact;

/// Maven repositories used by the alternate loader.
pub const FABRIC_MAVEN: &str = "https://maven.fabricmc.net/";
pub const LEGACY_FABRIC_MAVEN: &str = "https://maven.legacyfabric.net/";
