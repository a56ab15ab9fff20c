mod asset_index;

pub use asset_index::{asset_object_url, AssetIndex, AssetObject, RESOURCES_URL};
