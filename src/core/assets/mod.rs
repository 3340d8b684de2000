mod asset_index;

pub use asset_index::{AssetManager, AssetReport, RESOURCES_URL};
