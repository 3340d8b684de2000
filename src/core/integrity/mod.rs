pub mod checksum;
pub mod manifest;
pub mod protected;
pub mod reconciler;
pub mod remote;

pub use manifest::{Manifest, ManifestRecord, LOCAL_MANIFEST};
pub use protected::{verify_and_restore, ProtectedFile};
pub use reconciler::{check_and_update, ReconcileReport};
pub use remote::{ContentSource, RemoteManifestFetcher, RetryPolicy};
