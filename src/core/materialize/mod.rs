// ─── Dependency Materializer ───
// Makes every library, native classifier and asset object named by an
// effective descriptor exist locally. Present files are never refetched.

mod libraries;

pub use libraries::{plan_libraries, LibraryPlan};

use tracing::{info, warn};

use crate::core::assets::AssetIndex;
use crate::core::config::LauncherConfig;
use crate::core::downloader::{materialize_all, DownloadTask, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{emit_log, EventSink, LogLevel, ProgressCategory, ProgressEvent};
use crate::core::hash;
use crate::core::rules::Platform;
use crate::core::version::VersionDescriptor;

#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub libraries: usize,
    pub assets: usize,
    pub failures: Vec<(DownloadTask, LauncherError)>,
}

pub struct DependencyMaterializer<'a> {
    config: &'a LauncherConfig,
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn EventSink,
    platform: Platform,
    instance_id: Option<&'a str>,
}

impl<'a> DependencyMaterializer<'a> {
    pub fn new(config: &'a LauncherConfig, fetcher: &'a dyn Fetcher, sink: &'a dyn EventSink) -> Self {
        Self {
            config,
            fetcher,
            sink,
            platform: Platform::current(),
            instance_id: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn for_instance(mut self, instance_id: &'a str) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    fn progress(&self, category: ProgressCategory, done: usize, total: usize, label: &str) {
        let mut event = ProgressEvent::counted(category, done as u64, total as u64).with_label(label);
        if let Some(id) = self.instance_id {
            event = event.for_instance(id);
        }
        self.sink.progress(event);
    }

    fn log(&self, level: LogLevel, message: String) {
        emit_log(self.sink, self.instance_id, level, message);
    }

    /// Libraries first, then the asset pass, awaited in full.
    pub async fn materialize(&self, descriptor: &VersionDescriptor) -> LauncherResult<MaterializeReport> {
        let mut report = MaterializeReport::default();

        let (count, failures) = self.materialize_libraries(descriptor).await;
        report.libraries = count;
        report.failures.extend(failures);

        let (count, failures) = self.materialize_assets(descriptor).await?;
        report.assets = count;
        report.failures.extend(failures);

        for (task, err) in &report.failures {
            if matches!(err, LauncherError::HashMismatch { .. }) {
                self.progress(ProgressCategory::Hash, 1, 1, &format!("Hash mismatch: {:?}", task.dest));
            }
        }
        if !report.failures.is_empty() {
            self.log(
                LogLevel::Warn,
                format!("{} artifacts could not be materialized", report.failures.len()),
            );
        }
        Ok(report)
    }

    pub async fn materialize_libraries(
        &self,
        descriptor: &VersionDescriptor,
    ) -> (usize, Vec<(DownloadTask, LauncherError)>) {
        let plan = plan_libraries(descriptor, &self.config.libraries_dir(), &self.platform);
        for name in &plan.unresolved {
            warn!("Library {} has no download URL and is not on disk", name);
            self.log(LogLevel::Warn, format!("Skipping library without URL: {}", name));
        }

        let total = plan.tasks.len();
        info!(
            "Materializing {} libraries for {} ({} filtered by rules)",
            total, descriptor.id, plan.filtered
        );
        let failures = materialize_all(
            self.fetcher,
            plan.tasks,
            self.config.tunables().library_workers,
            |done, total| self.progress(ProgressCategory::Libraries, done, total, "Libraries"),
        )
        .await;
        (total, failures)
    }

    /// Index first (fetched once, verified when a hash is published), then objects
    /// through a fixed-size pool with progress every `progress_cadence` completions.
    pub async fn materialize_assets(
        &self,
        descriptor: &VersionDescriptor,
    ) -> LauncherResult<(usize, Vec<(DownloadTask, LauncherError)>)> {
        let index_ref = match &descriptor.asset_index {
            Some(r) => r,
            None => {
                warn!("{} declares no asset index, skipping assets", descriptor.id);
                return Ok((0, Vec::new()));
            }
        };

        let index_path = self
            .config
            .asset_indexes_dir()
            .join(format!("{}.json", index_ref.id));
        let raw = if index_path.exists() {
            tokio::fs::read(&index_path)
                .await
                .map_err(|e| LauncherError::io(&index_path, e))?
        } else {
            let bytes = self.fetcher.fetch_bytes(&index_ref.url).await?;
            if let Some(expected) = index_ref.sha1.as_deref() {
                let actual = hash::sha1_hex(&bytes);
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(LauncherError::HashMismatch {
                        path: index_path,
                        algorithm: "sha1",
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }
            let dir = self.config.asset_indexes_dir();
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| LauncherError::io(&dir, e))?;
            tokio::fs::write(&index_path, &bytes)
                .await
                .map_err(|e| LauncherError::io(&index_path, e))?;
            bytes
        };

        let index = AssetIndex::parse(&raw)?;
        let tasks = index.download_tasks(&self.config.asset_objects_dir());
        let total = tasks.len();
        let cadence = self.config.tunables().progress_cadence.max(1);
        info!("Materializing {} asset objects for index {}", total, index_ref.id);

        let failures = materialize_all(
            self.fetcher,
            tasks,
            self.config.tunables().asset_workers,
            |done, total| {
                if done % cadence == 0 || done == total {
                    self.progress(ProgressCategory::Assets, done, total, "Assets");
                }
            },
        )
        .await;
        Ok((total, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Tunables;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::events::testing::RecordingSink;
    use crate::core::testing::{scratch_dir, seed_vanilla};
    use serde_json::json;

    const LINUX: Platform = Platform {
        os: "linux",
        arch: "x86_64",
    };
    const BRIGADIER_URL: &str =
        "https://libraries.minecraft.net/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar";

    fn asset_index_json() -> serde_json::Value {
        json!({ "objects": {
            "a.ogg": { "hash": "86f7e437faa5a7fce15d1ddcb9eaeaea377667b8", "size": 1 },
            "b.ogg": { "hash": "e9d71f5ee7c92d6dc9e92ffdad17b8bd49418f98", "size": 1 }
        }})
    }

    fn vanilla_fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with_route(BRIGADIER_URL, b"brigadier")
            .with_json("https://piston-meta.example/5.json", &asset_index_json())
            .with_route(
                "https://resources.download.minecraft.net/86/86f7e437faa5a7fce15d1ddcb9eaeaea377667b8",
                b"a",
            )
            .with_route(
                "https://resources.download.minecraft.net/e9/e9d71f5ee7c92d6dc9e92ffdad17b8bd49418f98",
                b"b",
            )
    }

    #[tokio::test]
    async fn vanilla_descriptor_fetches_only_vanilla_artifacts() {
        let root = scratch_dir("materialize-vanilla");
        let config = LauncherConfig::new(&root);
        seed_vanilla(&config, "1.20.1");
        let descriptor = VersionDescriptor::load_effective(&config, "1.20.1").await.unwrap();

        let fetcher = vanilla_fetcher();
        let sink = RecordingSink::default();
        let report = DependencyMaterializer::new(&config, &fetcher, &sink)
            .with_platform(LINUX)
            .materialize(&descriptor)
            .await
            .unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.libraries, 1);
        assert_eq!(report.assets, 2);
        assert!(config
            .asset_objects_dir()
            .join("86/86f7e437faa5a7fce15d1ddcb9eaeaea377667b8")
            .exists());
        assert!(config.asset_indexes_dir().join("5.json").exists());

        let loader_hosts = ["fabricmc", "quiltmc", "minecraftforge", "neoforged", "legacyfabric"];
        assert!(fetcher
            .calls()
            .iter()
            .all(|url| loader_hosts.iter().all(|host| !url.contains(host))));
    }

    #[tokio::test]
    async fn second_pass_is_fully_offline() {
        let root = scratch_dir("materialize-idempotent");
        let config = LauncherConfig::new(&root);
        seed_vanilla(&config, "1.20.1");
        let descriptor = VersionDescriptor::load_effective(&config, "1.20.1").await.unwrap();
        let sink = RecordingSink::default();

        let first = vanilla_fetcher();
        DependencyMaterializer::new(&config, &first, &sink)
            .with_platform(LINUX)
            .materialize(&descriptor)
            .await
            .unwrap();

        let offline = StaticFetcher::default();
        let report = DependencyMaterializer::new(&config, &offline, &sink)
            .with_platform(LINUX)
            .materialize(&descriptor)
            .await
            .unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(offline.call_count(), 0);
    }

    #[tokio::test]
    async fn asset_progress_follows_cadence() {
        let root = scratch_dir("materialize-cadence");
        let config = LauncherConfig::new(&root).with_tunables(Tunables {
            progress_cadence: 50,
            ..Tunables::default()
        });
        seed_vanilla(&config, "1.20.1");
        let descriptor = VersionDescriptor::load_effective(&config, "1.20.1").await.unwrap();

        let mut objects = serde_json::Map::new();
        let mut fetcher = StaticFetcher::default();
        for i in 0..120u32 {
            let body = format!("object-{}", i);
            let sha = hash::sha1_hex(body.as_bytes());
            fetcher = fetcher.with_route(
                &format!("https://resources.download.minecraft.net/{}/{}", &sha[..2], sha),
                body.as_bytes(),
            );
            objects.insert(format!("obj/{}", i), json!({ "hash": sha, "size": body.len() }));
        }
        let fetcher = fetcher.with_json(
            "https://piston-meta.example/5.json",
            &json!({ "objects": objects }),
        );

        let sink = RecordingSink::default();
        let (count, failures) = DependencyMaterializer::new(&config, &fetcher, &sink)
            .with_platform(LINUX)
            .materialize_assets(&descriptor)
            .await
            .unwrap();
        assert_eq!(count, 120);
        assert!(failures.is_empty());

        let currents: Vec<u64> = sink
            .progress_in(ProgressCategory::Assets)
            .iter()
            .map(|p| p.current)
            .collect();
        assert_eq!(currents, vec![50, 100, 120]);
    }
}
