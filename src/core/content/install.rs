use tracing::{info, warn};

use super::registry::best_version;
use super::ContentPipeline;
use crate::core::downloader::{materialize, DownloadTask, MaterializeOutcome};
use crate::core::error::{LauncherError, LauncherResult, OperationResult};
use crate::core::instance::{ContentCategory, ContentMetadata, ContentSource};

impl ContentPipeline<'_> {
    /// Install the newest compatible build of a registry project into the
    /// matching content folder and record it on the instance.
    pub async fn install(&self, instance_id: &str, project_id: &str) -> OperationResult<ContentMetadata> {
        let result = self.try_install(instance_id, project_id).await;
        self.finish("install", Some(instance_id), result)
    }

    async fn try_install(&self, instance_id: &str, project_id: &str) -> LauncherResult<ContentMetadata> {
        let instance = self.catalog.get(instance_id).await?;
        let project = self.registry.project(project_id).await?;
        let category = ContentCategory::from_project_type(&project.project_type).ok_or_else(|| {
            LauncherError::Unsupported(format!(
                "{} projects cannot be installed into an instance",
                project.project_type
            ))
        })?;

        let versions = self.registry.project_versions(&project.id).await?;
        let loader = instance.loader.as_ref().map(|l| &l.kind);
        let version = best_version(&versions, &instance.version, loader, category).ok_or_else(|| {
            LauncherError::NotFound {
                kind: "compatible version",
                id: format!("{} for {}", project.slug, instance.version),
            }
        })?;
        let file = version.primary_file().ok_or_else(|| LauncherError::NotFound {
            kind: "version file",
            id: version.id.clone(),
        })?;

        let dest = instance.content_dir(category).join(&file.filename);
        let task = DownloadTask::new(&file.url, &dest).with_sha1(file.sha1());
        match materialize(self.fetcher, &task).await {
            Ok(MaterializeOutcome::Downloaded) => info!("Installed {} into {:?}", file.filename, dest),
            Ok(MaterializeOutcome::AlreadyPresent) => info!("{} already present", file.filename),
            Err(e) => {
                self.report_hash_mismatch(instance_id, &e);
                return Err(e);
            }
        }

        let authors = match self.registry.members(&project.id).await {
            Ok(authors) => authors,
            Err(e) => {
                warn!("Could not load team of {}: {}", project.id, e);
                Vec::new()
            }
        };
        let record = ContentMetadata {
            id: project.id.clone(),
            name: project.title.clone(),
            authors,
            version: version.version_number.clone(),
            file_name: file.filename.clone(),
            enabled: true,
            source: ContentSource::Modrinth,
            icon: project.icon_url.clone(),
        };

        let stored = record.clone();
        self.catalog
            .update(instance_id, Box::new(move |i| i.upsert_content(category, stored)))
            .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LauncherConfig;
    use crate::core::content::testing::FakeRegistry;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::error::ErrorKind;
    use crate::core::events::testing::RecordingSink;
    use crate::core::events::ProgressCategory;
    use crate::core::hash::{self, sha1_hex, ExpectedHash};
    use crate::core::instance::{Instance, InstanceCatalog, JsonInstanceCatalog, MemoryBounds};
    use crate::core::loaders::{LoaderKind, LoaderSpec};
    use crate::core::testing::scratch_dir;
    use serde_json::{json, Value};

    const SODIUM_URL: &str = "https://cdn.modrinth.com/data/AANobbMI/sodium-0.5.3.jar";

    fn sodium(sha1: &str) -> FakeRegistry {
        let file = |game: &str, loader: &str, id: &str| -> Value {
            json!({
                "id": id,
                "project_id": "AANobbMI",
                "version_number": id,
                "game_versions": [game],
                "loaders": [loader],
                "date_published": "2023-09-01T00:00:00Z",
                "files": [{ "url": SODIUM_URL, "filename": "sodium-0.5.3.jar", "primary": true,
                            "hashes": { "sha1": sha1 } }]
            })
        };
        FakeRegistry::default().with_project(
            json!({ "id": "AANobbMI", "slug": "sodium", "title": "Sodium", "project_type": "mod" }),
            vec![
                file("1.20.1", "fabric", "0.5.3"),
                file("1.20.1", "forge", "0.5.3-forge"),
            ],
            &["jellysquid3"],
        )
    }

    async fn fabric_instance(catalog: &JsonInstanceCatalog, config: &LauncherConfig) -> Instance {
        catalog
            .create(Instance::new(
                "Fabric",
                "1.20.1",
                Some(LoaderSpec::new(LoaderKind::Fabric, "0.15.0")),
                MemoryBounds::default(),
                &config.instances_dir(),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn installed_file_verifies_until_corrupted() {
        let root = scratch_dir("install-roundtrip");
        let config = LauncherConfig::new(&root);
        let catalog = JsonInstanceCatalog::new(config.instances_file());
        let instance = fabric_instance(&catalog, &config).await;

        let body = b"sodium jar bytes";
        let registry = sodium(&sha1_hex(body));
        let fetcher = StaticFetcher::default().with_route(SODIUM_URL, body);
        let sink = RecordingSink::default();
        let pipeline = ContentPipeline::new(&config, &fetcher, &registry, &catalog, &sink);

        let result = pipeline.install(&instance.id, "AANobbMI").await;
        assert!(result.success);
        let record = result.value.unwrap();
        assert_eq!(record.version, "0.5.3");
        assert_eq!(record.authors, vec!["jellysquid3".to_string()]);

        let stored = catalog.get(&instance.id).await.unwrap();
        assert_eq!(stored.mods, vec![record]);

        let path = instance.content_dir(ContentCategory::Mods).join("sodium-0.5.3.jar");
        let expected = ExpectedHash::Sha1(sha1_hex(body));
        hash::verify_file(&path, &expected).await.unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            hash::verify_file(&path, &expected).await,
            Err(LauncherError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn mismatch_on_download_is_reported_and_not_recorded() {
        let root = scratch_dir("install-mismatch");
        let config = LauncherConfig::new(&root);
        let catalog = JsonInstanceCatalog::new(config.instances_file());
        let instance = fabric_instance(&catalog, &config).await;

        let registry = sodium(&sha1_hex(b"something else"));
        let fetcher = StaticFetcher::default().with_route(SODIUM_URL, b"sodium jar bytes");
        let sink = RecordingSink::default();
        let pipeline = ContentPipeline::new(&config, &fetcher, &registry, &catalog, &sink);

        let result = pipeline.install(&instance.id, "AANobbMI").await;
        assert!(!result.success);
        assert_eq!(result.kind, Some(ErrorKind::HashMismatch));
        assert_eq!(sink.progress_in(ProgressCategory::Hash).len(), 1);
        assert!(catalog.get(&instance.id).await.unwrap().mods.is_empty());
    }

    #[tokio::test]
    async fn no_build_for_game_version_is_not_found() {
        let root = scratch_dir("install-incompatible");
        let config = LauncherConfig::new(&root);
        let catalog = JsonInstanceCatalog::new(config.instances_file());
        let instance = catalog
            .create(Instance::new(
                "Old",
                "1.16.5",
                None,
                MemoryBounds::default(),
                &config.instances_dir(),
            ))
            .await
            .unwrap();

        let registry = sodium("x");
        let fetcher = StaticFetcher::default();
        let sink = RecordingSink::default();
        let pipeline = ContentPipeline::new(&config, &fetcher, &registry, &catalog, &sink);

        let result = pipeline.install(&instance.id, "AANobbMI").await;
        assert_eq!(result.kind, Some(ErrorKind::NotFound));
        assert_eq!(fetcher.call_count(), 0);
    }
}
