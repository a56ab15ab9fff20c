use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::Instance;
use crate::core::error::{LauncherError, LauncherResult};

/// Mutation applied to one record under the catalog's write lock.
pub type InstanceUpdate = Box<dyn FnOnce(&mut Instance) + Send>;

/// Where instance records live. The engine reads records, appends content
/// metadata and, for modpack import, creates one record.
#[async_trait]
pub trait InstanceCatalog: Send + Sync {
    async fn get(&self, id: &str) -> LauncherResult<Instance>;

    async fn list(&self) -> LauncherResult<Vec<Instance>>;

    async fn create(&self, instance: Instance) -> LauncherResult<Instance>;

    /// Read-modify-write of a single record. Returns the record as stored.
    async fn update(&self, id: &str, apply: InstanceUpdate) -> LauncherResult<Instance>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InstancesDocument {
    #[serde(default)]
    instances: Vec<Instance>,
}

/// All records in one `instances.json`. Every write holds one mutex for the
/// whole read-modify-write so concurrent installs cannot lose updates.
pub struct JsonInstanceCatalog {
    file: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonInstanceCatalog {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    async fn read(&self) -> LauncherResult<InstancesDocument> {
        match tokio::fs::read(&self.file).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(InstancesDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InstancesDocument::default()),
            Err(e) => Err(LauncherError::io(&self.file, e)),
        }
    }

    async fn write(&self, doc: &InstancesDocument) -> LauncherResult<()> {
        if let Some(parent) = self.file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = self.file.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| LauncherError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.file)
            .await
            .map_err(|e| LauncherError::io(&self.file, e))
    }
}

#[async_trait]
impl InstanceCatalog for JsonInstanceCatalog {
    async fn get(&self, id: &str) -> LauncherResult<Instance> {
        self.read()
            .await?
            .instances
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| LauncherError::InstanceNotFound(id.to_string()))
    }

    async fn list(&self) -> LauncherResult<Vec<Instance>> {
        Ok(self.read().await?.instances)
    }

    async fn create(&self, instance: Instance) -> LauncherResult<Instance> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        if doc.instances.iter().any(|i| i.id == instance.id) {
            return Err(LauncherError::Other(format!(
                "instance {} already exists",
                instance.id
            )));
        }

        instance.ensure_layout().await?;
        doc.instances.push(instance.clone());
        self.write(&doc).await?;
        info!("Created instance '{}' ({})", instance.name, instance.id);
        Ok(instance)
    }

    async fn update(&self, id: &str, apply: InstanceUpdate) -> LauncherResult<Instance> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let record = doc
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| LauncherError::InstanceNotFound(id.to_string()))?;
        apply(record);
        let updated = record.clone();
        self.write(&doc).await?;
        debug!("Updated instance {}", id);
        Ok(updated)
    }
}
