// ─── Launch Pipeline ───
// resolve → materialize → natives → assemble → spawn, with every failure
// turned into a structured result plus one classified log line.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::classpath::{build_classpath, join_classpath};
use super::command::{assemble, LaunchCommand, LaunchContext};
use super::natives::NativeExtractor;
use super::process::{spawn_game, GameProcess};
use crate::core::auth::Credentials;
use crate::core::config::LauncherConfig;
use crate::core::downloader::Fetcher;
use crate::core::error::{LauncherResult, OperationResult};
use crate::core::events::{emit_log, EventSink, LogLevel};
use crate::core::http::probe_connectivity;
use crate::core::instance::{Instance, InstanceCatalog};
use crate::core::java::JavaProvisioner;
use crate::core::materialize::DependencyMaterializer;
use crate::core::rules::Platform;
use crate::core::version::{Resolution, VersionDescriptor, VersionResolver};

/// Everything needed to spawn, computed without starting a process.
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub resolution: Resolution,
    pub command: LaunchCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOutcome {
    pub instance_id: String,
    pub version_id: String,
    pub warning: Option<String>,
    pub pid: Option<u32>,
    /// Only set when the launch waited for the game to exit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

pub struct Launcher {
    config: Arc<LauncherConfig>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn EventSink>,
    catalog: Arc<dyn InstanceCatalog>,
    platform: Platform,
}

impl Launcher {
    pub fn new(
        config: Arc<LauncherConfig>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn EventSink>,
        catalog: Arc<dyn InstanceCatalog>,
    ) -> Self {
        Self {
            config,
            fetcher,
            sink,
            catalog,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Resolve, materialize, extract natives and assemble the command for
    /// `instance` using the given Java executable.
    pub async fn prepare(
        &self,
        instance: &Instance,
        credentials: &Credentials,
        java: &Path,
    ) -> LauncherResult<PreparedLaunch> {
        let config = &*self.config;
        let fetcher = &*self.fetcher;
        let sink = &*self.sink;

        let resolution = VersionResolver::new(config, fetcher, sink)
            .for_instance(&instance.id)
            .prepare_custom_version(&instance.version, instance.loader.as_ref(), java)
            .await?;
        if let Some(warning) = &resolution.warning {
            emit_log(sink, Some(&instance.id), LogLevel::Warn, warning.clone());
        }

        let descriptor = VersionDescriptor::load_effective(config, &resolution.version_id).await?;

        DependencyMaterializer::new(config, fetcher, sink)
            .with_platform(self.platform)
            .for_instance(&instance.id)
            .materialize(&descriptor)
            .await?;

        let natives = NativeExtractor::new(config, fetcher, sink)
            .with_platform(self.platform)
            .for_instance(&instance.id)
            .extract(&descriptor, &instance.natives_dir(), &instance.version)
            .await?;

        let classpath = join_classpath(&build_classpath(config, &descriptor, &self.platform)?);
        let command = assemble(&LaunchContext {
            config,
            descriptor: &descriptor,
            instance,
            credentials,
            java,
            natives_dir: &natives.dir,
            classpath: &classpath,
            platform: self.platform,
        })?;

        Ok(PreparedLaunch {
            resolution,
            command,
        })
    }

    async fn run(
        &self,
        instance_id: &str,
        credentials: &Credentials,
    ) -> LauncherResult<(LaunchOutcome, GameProcess)> {
        let instance = self.catalog.get(instance_id).await?;
        probe_connectivity(&self.config).await?;

        let java = JavaProvisioner::new(&self.config, &*self.fetcher, &*self.sink)
            .with_platform(self.platform)
            .for_instance(&instance.id)
            .ensure_for_game(&instance.version)
            .await?;

        let prepared = self.prepare(&instance, credentials, &java).await?;
        let process = spawn_game(&prepared.command, &instance.id, self.sink.clone())?;

        if let Err(e) = self
            .catalog
            .update(&instance.id, Box::new(|i| i.last_played = Some(Utc::now())))
            .await
        {
            warn!("Could not record last launch for {}: {}", instance.id, e);
        }

        info!(
            "Instance {} running {} (pid {:?})",
            instance.id, prepared.resolution.version_id, process.pid
        );
        let outcome = LaunchOutcome {
            instance_id: instance.id,
            version_id: prepared.resolution.version_id,
            warning: prepared.resolution.warning,
            pid: process.pid,
            exit_code: None,
        };
        Ok((outcome, process))
    }

    /// Start the game for `instance_id` and return once it is running. The
    /// supervisor keeps forwarding output for as long as the runtime lives.
    pub async fn launch(&self, instance_id: &str, credentials: &Credentials) -> OperationResult<LaunchOutcome> {
        self.launch_with(instance_id, credentials, false).await
    }

    /// Like [`Launcher::launch`], but waits for the game to exit.
    pub async fn launch_attached(
        &self,
        instance_id: &str,
        credentials: &Credentials,
    ) -> OperationResult<LaunchOutcome> {
        self.launch_with(instance_id, credentials, true).await
    }

    async fn launch_with(
        &self,
        instance_id: &str,
        credentials: &Credentials,
        attached: bool,
    ) -> OperationResult<LaunchOutcome> {
        match self.run(instance_id, &credentials.clone().sanitized()).await {
            Ok((mut outcome, process)) => {
                if attached {
                    outcome.exit_code = process.wait().await;
                }
                OperationResult::ok(outcome)
            }
            Err(e) => {
                error!("Launch of {} failed: {}", instance_id, e);
                emit_log(
                    &*self.sink,
                    Some(instance_id),
                    LogLevel::Error,
                    format!("Launch failed: {}", e),
                );
                OperationResult::failed(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Tunables;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::error::ErrorKind;
    use crate::core::events::testing::RecordingSink;
    use crate::core::instance::{JsonInstanceCatalog, MemoryBounds};
    use crate::core::loaders::{LoaderKind, LoaderSpec};
    use crate::core::testing::{scratch_dir, seed_vanilla};
    use serde_json::json;

    const LINUX: Platform = Platform {
        os: "linux",
        arch: "x86_64",
    };
    const BRIGADIER_URL: &str =
        "https://libraries.minecraft.net/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar";
    const FABRIC_LOADER_URL: &str =
        "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar";
    const FABRIC_PROFILE_URL: &str =
        "https://meta.fabricmc.net/v2/versions/loader/1.20.1/0.15.0/profile/json";

    fn base_fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with_route(BRIGADIER_URL, b"brigadier")
            .with_json("https://piston-meta.example/5.json", &json!({ "objects": {} }))
    }

    fn launcher(root: &Path, fetcher: StaticFetcher, sink: Arc<RecordingSink>) -> Launcher {
        let config = Arc::new(LauncherConfig::new(root));
        let catalog = Arc::new(JsonInstanceCatalog::new(config.instances_file()));
        Launcher::new(config, Arc::new(fetcher), sink, catalog).with_platform(LINUX)
    }

    fn instance(root: &Path, loader: Option<LoaderSpec>) -> Instance {
        Instance::new(
            "Test",
            "1.20.1",
            loader,
            MemoryBounds {
                min_mb: 2048,
                max_mb: 4096,
            },
            &root.join("instances"),
        )
    }

    #[tokio::test]
    async fn vanilla_launch_resolves_plain_version_and_ends_classpath_with_client_jar() {
        let root = scratch_dir("pipeline-vanilla");
        seed_vanilla(&LauncherConfig::new(&root), "1.20.1");
        let sink = Arc::new(RecordingSink::default());
        let launcher = launcher(&root, base_fetcher(), sink.clone());
        let instance = instance(&root, None);

        let prepared = launcher
            .prepare(&instance, &Credentials::offline("Steve"), Path::new("java"))
            .await
            .unwrap();

        assert_eq!(prepared.resolution.version_id, "1.20.1");
        assert!(prepared.resolution.warning.is_none());
        let cmd = &prepared.command;
        let cp = &cmd.jvm_args[cmd.jvm_args.iter().position(|a| a == "-cp").unwrap() + 1];
        let client_jar = root.join("versions").join("1.20.1").join("1.20.1.jar");
        assert!(cp.ends_with(&*client_jar.to_string_lossy()));
        assert_eq!(&cmd.jvm_args[..2], &["-Xmx4096M".to_string(), "-Xms2048M".to_string()][..]);
        assert_eq!(cmd.working_dir, instance.path);
    }

    #[tokio::test]
    async fn fabric_launch_puts_loader_and_vanilla_jar_on_classpath() {
        let root = scratch_dir("pipeline-fabric");
        seed_vanilla(&LauncherConfig::new(&root), "1.20.1");
        let fetcher = base_fetcher()
            .with_json(
                FABRIC_PROFILE_URL,
                &json!({
                    "id": "fabric-loader-0.15.0-1.20.1",
                    "inheritsFrom": "1.20.1",
                    "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                    "arguments": { "game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "] },
                    "libraries": [
                        { "name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/" }
                    ]
                }),
            )
            .with_route(FABRIC_LOADER_URL, b"loader");
        let sink = Arc::new(RecordingSink::default());
        let launcher = launcher(&root, fetcher, sink.clone());
        let instance = instance(&root, Some(LoaderSpec::new(LoaderKind::Fabric, "0.15.0")));

        let prepared = launcher
            .prepare(&instance, &Credentials::offline("Steve"), Path::new("java"))
            .await
            .unwrap();

        assert_eq!(prepared.resolution.version_id, "1.20.1-fabric-0.15.0");
        let cmd = &prepared.command;
        assert_eq!(cmd.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        let cp = &cmd.jvm_args[cmd.jvm_args.iter().position(|a| a == "-cp").unwrap() + 1];
        assert!(cp.contains("fabric-loader-0.15.0.jar"));
        assert!(cp.ends_with("1.20.1.jar"));
        assert!(cmd.game_args.windows(2).any(|w| w == ["--version", "1.20.1-fabric-0.15.0"]));
    }

    #[tokio::test]
    async fn offline_probe_refuses_launch_before_downloads() {
        let root = scratch_dir("pipeline-offline");
        let config = Arc::new(LauncherConfig::new(&root).with_tunables(Tunables {
            probe_host: "blocklaunch.invalid:443".into(),
            probe_timeout_secs: 2,
            ..Tunables::default()
        }));
        let catalog = Arc::new(JsonInstanceCatalog::new(config.instances_file()));
        let created = catalog.create(instance(&root, None)).await.unwrap();

        let fetcher = Arc::new(StaticFetcher::default());
        let sink = Arc::new(RecordingSink::default());
        let launcher = Launcher::new(config, fetcher.clone(), sink.clone(), catalog);

        let result = launcher.launch(&created.id, &Credentials::default()).await;
        assert!(!result.success);
        assert_eq!(result.kind, Some(ErrorKind::OfflinePrecondition));
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(sink.logs_at(LogLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn unknown_instance_is_a_structured_failure() {
        let root = scratch_dir("pipeline-missing");
        let sink = Arc::new(RecordingSink::default());
        let launcher = launcher(&root, StaticFetcher::default(), sink.clone());

        let result = launcher.launch("nope", &Credentials::default()).await;
        assert!(!result.success);
        assert_eq!(result.kind, Some(ErrorKind::NotFound));
        assert!(result.error.unwrap().contains("nope"));
    }
}
