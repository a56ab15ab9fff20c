use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::downloader::DownloadTask;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    fn prefix(&self) -> &str {
        self.hash.get(..2).unwrap_or(&self.hash)
    }

    /// `objects/{hh}/{hash}` under `objects_dir`.
    pub fn local_path(&self, objects_dir: &Path) -> PathBuf {
        objects_dir.join(self.prefix()).join(&self.hash)
    }
}

pub fn asset_object_url(object: &AssetObject) -> String {
    format!("{}/{}/{}", RESOURCES_URL, object.prefix(), object.hash)
}

impl AssetIndex {
    pub fn parse(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    /// One task per distinct object hash. Several keys often share a hash.
    pub fn download_tasks(&self, objects_dir: &Path) -> Vec<DownloadTask> {
        let mut seen = HashSet::new();
        let mut tasks: Vec<DownloadTask> = self
            .objects
            .values()
            .filter(|obj| seen.insert(obj.hash.as_str()))
            .map(|obj| {
                DownloadTask::new(asset_object_url(obj), obj.local_path(objects_dir))
                    .with_sha1(Some(&obj.hash))
            })
            .collect();
        tasks.sort_by(|a, b| a.dest.cmp(&b.dest));
        tasks
    }
}
