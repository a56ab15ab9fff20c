use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::metadata::{filename_fallback, infer_local_metadata, LocalMetadata};
use super::ContentPipeline;
use crate::core::error::{LauncherError, LauncherResult, OperationResult};
use crate::core::events::{ProgressCategory, ProgressEvent};
use crate::core::hash;
use crate::core::instance::{ContentCategory, ContentMetadata, ContentSource, Instance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectReport {
    pub added: usize,
    pub kept: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
struct FoundFile {
    category: ContentCategory,
    file_name: String,
    enabled: bool,
    path: PathBuf,
}

/// Files and pack folders directly inside `dir`. A missing folder is empty.
async fn list_content(dir: &Path) -> LauncherResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LauncherError::io(dir, e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.ends_with(".part") {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Drop records whose file is gone, sync `enabled` with the folder the file
/// sits in, then append newly inferred records.
fn reconcile(
    record: &mut Instance,
    present: &[(ContentCategory, String, bool)],
    inferred: Vec<(ContentCategory, ContentMetadata)>,
) {
    for category in ContentCategory::ALL {
        let list = record.content_mut(category);
        list.retain(|m| {
            present
                .iter()
                .any(|(c, name, _)| *c == category && *name == m.file_name)
        });
        for m in list.iter_mut() {
            if let Some((_, _, enabled)) = present
                .iter()
                .find(|(c, name, _)| *c == category && *name == m.file_name)
            {
                m.enabled = *enabled;
            }
        }
    }
    for (category, meta) in inferred {
        let list = record.content_mut(category);
        if !list.iter().any(|m| m.file_name == meta.file_name) {
            list.push(meta);
        }
    }
}

impl ContentPipeline<'_> {
    /// Registry lookup by file hash, then embedded manifests, then the file name.
    pub(super) async fn describe_file(
        &self,
        path: &Path,
        enabled: bool,
        source: ContentSource,
    ) -> ContentMetadata {
        let file_name = file_name_of(path);

        if path.is_file() {
            match self.lookup_by_hash(path).await {
                Ok(Some(mut meta)) => {
                    meta.file_name = file_name;
                    meta.enabled = enabled;
                    if source == ContentSource::Modpack {
                        meta.source = source;
                    }
                    return meta;
                }
                Ok(None) => {}
                Err(e) => warn!("Registry lookup for {:?} failed: {}", path, e),
            }
        }

        let owned = path.to_path_buf();
        let local = match tokio::task::spawn_blocking(move || infer_local_metadata(&owned)).await {
            Ok(local) => local,
            Err(e) => {
                warn!("Metadata inference for {:?} aborted: {}", path, e);
                filename_fallback(&file_name)
            }
        };
        let LocalMetadata {
            id,
            name,
            authors,
            version,
            icon,
        } = local;
        ContentMetadata {
            id,
            name,
            authors,
            version,
            file_name,
            enabled,
            source,
            icon,
        }
    }

    async fn lookup_by_hash(&self, path: &Path) -> LauncherResult<Option<ContentMetadata>> {
        let sha1 = hash::sha1_file(path).await?;
        let version = match self.registry.version_by_hash(&sha1).await? {
            Some(v) => v,
            None => return Ok(None),
        };
        let project = self.registry.project(&version.project_id).await.ok();
        let authors = self
            .registry
            .members(&version.project_id)
            .await
            .unwrap_or_default();
        debug!("{:?} matched registry version {}", path, version.id);

        Ok(Some(ContentMetadata {
            id: version.project_id.clone(),
            name: project
                .as_ref()
                .map(|p| p.title.clone())
                .unwrap_or_else(|| version.name.clone()),
            authors,
            version: version.version_number,
            file_name: String::new(),
            enabled: true,
            source: ContentSource::Modrinth,
            icon: project.and_then(|p| p.icon_url),
        }))
    }

    /// Scan every content folder of an instance and bring its records in line
    /// with what is on disk.
    pub async fn detect(&self, instance_id: &str) -> OperationResult<DetectReport> {
        let result = self.try_detect(instance_id).await;
        self.finish("detect", Some(instance_id), result)
    }

    async fn try_detect(&self, instance_id: &str) -> LauncherResult<DetectReport> {
        let instance = self.catalog.get(instance_id).await?;

        let mut found = Vec::new();
        for category in ContentCategory::ALL {
            let folders = [
                (instance.content_dir(category), true),
                (instance.disabled_dir(category), false),
            ];
            for (dir, enabled) in folders {
                for path in list_content(&dir).await? {
                    found.push(FoundFile {
                        category,
                        file_name: file_name_of(&path),
                        enabled,
                        path,
                    });
                }
            }
        }

        let known: HashSet<(ContentCategory, &str)> = ContentCategory::ALL
            .into_iter()
            .flat_map(|c| instance.content(c).iter().map(move |m| (c, m.file_name.as_str())))
            .collect();
        let unknown: Vec<FoundFile> = found
            .iter()
            .filter(|f| !known.contains(&(f.category, f.file_name.as_str())))
            .cloned()
            .collect();

        let total = unknown.len();
        let completed = AtomicUsize::new(0);
        let workers = self.config.tunables().detect_workers.max(1);
        info!(
            "Detecting {} new files in {} ({} workers)",
            total, instance_id, workers
        );

        let inferred: Vec<(ContentCategory, ContentMetadata)> = stream::iter(unknown)
            .map(|file| {
                let completed = &completed;
                async move {
                    let meta = self
                        .describe_file(&file.path, file.enabled, ContentSource::Local)
                        .await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.sink.progress(
                        ProgressEvent::counted(ProgressCategory::Detect, done as u64, total as u64)
                            .with_label(file.file_name.clone())
                            .for_instance(instance_id),
                    );
                    (file.category, meta)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let present: Vec<(ContentCategory, String, bool)> = found
            .into_iter()
            .map(|f| (f.category, f.file_name, f.enabled))
            .collect();
        let kept = known
            .iter()
            .filter(|(c, name)| present.iter().any(|(pc, pn, _)| pc == c && pn == name))
            .count();
        let report = DetectReport {
            added: inferred.len(),
            kept,
            removed: known.len() - kept,
        };

        self.catalog
            .update(
                instance_id,
                Box::new(move |record| reconcile(record, &present, inferred)),
            )
            .await?;

        info!(
            "Detection for {}: {} added, {} kept, {} removed",
            instance_id, report.added, report.kept, report.removed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LauncherConfig;
    use crate::core::content::testing::FakeRegistry;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::events::testing::RecordingSink;
    use crate::core::hash::sha1_hex;
    use crate::core::instance::{InstanceCatalog, JsonInstanceCatalog, MemoryBounds};
    use crate::core::testing::scratch_dir;
    use serde_json::json;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn fabric_jar(path: &Path) {
        let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        writer
            .start_file("fabric.mod.json", SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(br#"{"id":"lithium","name":"Lithium","version":"0.11.2"}"#)
            .unwrap();
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn detect_infers_new_files_and_drops_missing_ones() {
        let root = scratch_dir("detect-scan");
        let config = LauncherConfig::new(&root);
        let catalog = JsonInstanceCatalog::new(config.instances_file());
        let mut instance = Instance::new(
            "Scan",
            "1.20.1",
            None,
            MemoryBounds::default(),
            &config.instances_dir(),
        );
        instance.mods.push(ContentMetadata {
            id: "gone".into(),
            name: "Gone".into(),
            authors: Vec::new(),
            version: "1".into(),
            file_name: "gone.jar".into(),
            enabled: true,
            source: ContentSource::Local,
            icon: None,
        });
        let instance = catalog.create(instance).await.unwrap();

        fabric_jar(&instance.content_dir(ContentCategory::Mods).join("lithium.jar"));
        std::fs::write(
            instance.content_dir(ContentCategory::Mods).join("sodium.jar"),
            b"sodium",
        )
        .unwrap();
        std::fs::write(
            instance.disabled_dir(ContentCategory::Mods).join("Mystery-2.1.jar"),
            b"??",
        )
        .unwrap();
        std::fs::write(
            instance.content_dir(ContentCategory::Mods).join("half.jar.part"),
            b"",
        )
        .unwrap();

        let registry = FakeRegistry::default().with_project(
            json!({ "id": "AANobbMI", "title": "Sodium", "project_type": "mod", "icon_url": "https://cdn/icon.png" }),
            vec![json!({
                "id": "v1",
                "project_id": "AANobbMI",
                "version_number": "0.5.3",
                "files": [{ "url": "https://cdn/sodium.jar", "filename": "sodium.jar", "primary": true,
                            "hashes": { "sha1": sha1_hex(b"sodium") } }]
            })],
            &["jellysquid3"],
        );
        let fetcher = StaticFetcher::default();
        let sink = RecordingSink::default();
        let pipeline = ContentPipeline::new(&config, &fetcher, &registry, &catalog, &sink);

        let report = pipeline.detect(&instance.id).await.value.unwrap();
        assert_eq!(
            report,
            DetectReport {
                added: 3,
                kept: 0,
                removed: 1
            }
        );

        let stored = catalog.get(&instance.id).await.unwrap();
        let by_file = |name: &str| stored.mods.iter().find(|m| m.file_name == name).unwrap().clone();
        assert_eq!(stored.mods.len(), 3);

        let sodium = by_file("sodium.jar");
        assert_eq!(sodium.source, ContentSource::Modrinth);
        assert_eq!(sodium.authors, vec!["jellysquid3".to_string()]);
        assert_eq!(sodium.version, "0.5.3");

        let lithium = by_file("lithium.jar");
        assert_eq!(lithium.id, "lithium");
        assert_eq!(lithium.source, ContentSource::Local);

        let mystery = by_file("Mystery-2.1.jar");
        assert!(!mystery.enabled);
        assert_eq!(mystery.version, "2.1");

        assert_eq!(sink.progress_in(ProgressCategory::Detect).len(), 3);
    }

    #[tokio::test]
    async fn second_scan_keeps_existing_records() {
        let root = scratch_dir("detect-rescan");
        let config = LauncherConfig::new(&root);
        let catalog = JsonInstanceCatalog::new(config.instances_file());
        let instance = catalog
            .create(Instance::new(
                "Scan",
                "1.20.1",
                None,
                MemoryBounds::default(),
                &config.instances_dir(),
            ))
            .await
            .unwrap();
        std::fs::write(
            instance.content_dir(ContentCategory::ResourcePacks).join("Faithful-1.20.zip"),
            b"zip?",
        )
        .unwrap();

        let registry = FakeRegistry::default();
        let fetcher = StaticFetcher::default();
        let sink = RecordingSink::default();
        let pipeline = ContentPipeline::new(&config, &fetcher, &registry, &catalog, &sink);

        let first = pipeline.detect(&instance.id).await.value.unwrap();
        assert_eq!(first.added, 1);
        let second = pipeline.detect(&instance.id).await.value.unwrap();
        assert_eq!(
            second,
            DetectReport {
                added: 0,
                kept: 1,
                removed: 0
            }
        );
        assert_eq!(catalog.get(&instance.id).await.unwrap().resourcepacks.len(), 1);
    }
}
