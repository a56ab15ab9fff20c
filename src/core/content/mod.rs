// ─── Content Pipeline ───
// Search, install, modpack import, local detection and the enable/disable
// toggle for mods, resource packs, shader packs and data packs.

mod detect;
mod install;
mod manage;
mod metadata;
mod modpack;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

use serde_json::Value;
use tracing::error;

use crate::core::config::LauncherConfig;
use crate::core::downloader::Fetcher;
use crate::core::error::{LauncherError, LauncherResult, OperationResult};
use crate::core::events::{emit_log, EventSink, LogLevel, ProgressCategory, ProgressEvent};
use crate::core::instance::InstanceCatalog;

pub use detect::DetectReport;
pub use manage::ToggleOutcome;
pub use metadata::{filename_fallback, infer_local_metadata, LocalMetadata};
pub use modpack::{ModpackFile, ModpackManifest, ModpackReport, ModpackSource};
pub use registry::{
    best_version, ContentRegistry, ModrinthRegistry, RegistryFile, RegistryProject,
    RegistryVersion, SearchQuery, MODRINTH_API,
};

pub struct ContentPipeline<'a> {
    config: &'a LauncherConfig,
    fetcher: &'a dyn Fetcher,
    registry: &'a dyn ContentRegistry,
    catalog: &'a dyn InstanceCatalog,
    sink: &'a dyn EventSink,
}

impl<'a> ContentPipeline<'a> {
    pub fn new(
        config: &'a LauncherConfig,
        fetcher: &'a dyn Fetcher,
        registry: &'a dyn ContentRegistry,
        catalog: &'a dyn InstanceCatalog,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            config,
            fetcher,
            registry,
            catalog,
            sink,
        }
    }

    /// Registry search, returned exactly as the registry sent it.
    pub async fn search(&self, query: &SearchQuery) -> OperationResult<Value> {
        let result = self.registry.search(query).await;
        self.finish("search", None, result)
    }

    /// Turn an internal result into the host-facing one, logging failures.
    fn finish<T>(
        &self,
        operation: &str,
        instance_id: Option<&str>,
        result: LauncherResult<T>,
    ) -> OperationResult<T> {
        if let Err(e) = &result {
            error!("{} failed: {}", operation, e);
            emit_log(
                self.sink,
                instance_id,
                LogLevel::Error,
                format!("{} failed: {}", operation, e),
            );
        }
        result.into()
    }

    /// Distinct progress and log event for a file that failed verification.
    fn report_hash_mismatch(&self, instance_id: &str, err: &LauncherError) {
        if let LauncherError::HashMismatch { path, .. } = err {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.sink.progress(
                ProgressEvent::percent(ProgressCategory::Hash, 100)
                    .with_label(format!("Hash mismatch: {}", label))
                    .for_instance(instance_id),
            );
        }
        emit_log(self.sink, Some(instance_id), LogLevel::Error, err.to_string());
    }
}
