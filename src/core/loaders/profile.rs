// ─── Profile-based loaders ───
// Fabric, Quilt and legacy-fabric publish a ready-made version profile that
// inherits from vanilla. We persist it under the synthetic id and make sure
// the loader jar itself is on disk.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{LoaderContext, LoaderStrategy};
use crate::core::downloader::{materialize, DownloadTask};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{FABRIC_MAVEN, LEGACY_FABRIC_MAVEN, QUILT_MAVEN};
use crate::core::version::LibraryEntry;

pub struct ProfileStrategy {
    name: &'static str,
    meta_base: &'static str,
    maven: &'static str,
    /// `group:artifact` of the loader implementation jar.
    loader_artifact: &'static str,
}

impl ProfileStrategy {
    pub const FABRIC: Self = Self {
        name: "Fabric",
        meta_base: "https://meta.fabricmc.net/v2",
        maven: FABRIC_MAVEN,
        loader_artifact: "net.fabricmc:fabric-loader",
    };

    pub const QUILT: Self = Self {
        name: "Quilt",
        meta_base: "https://meta.quiltmc.org/v3",
        maven: QUILT_MAVEN,
        loader_artifact: "org.quiltmc:quilt-loader",
    };

    pub const LEGACY_FABRIC: Self = Self {
        name: "Legacy Fabric",
        meta_base: "https://meta.legacyfabric.net/v2",
        maven: LEGACY_FABRIC_MAVEN,
        loader_artifact: "net.fabricmc:fabric-loader",
    };

    pub fn meta_base(&self) -> &'static str {
        self.meta_base
    }

    pub fn profile_url(&self, game_version: &str, loader_version: &str) -> String {
        format!(
            "{}/versions/loader/{}/{}/profile/json",
            self.meta_base, game_version, loader_version
        )
    }

    fn loader_library(&self, profile: &Value) -> Option<LibraryEntry> {
        let prefix = format!("{}:", self.loader_artifact);
        profile
            .get("libraries")?
            .as_array()?
            .iter()
            .filter_map(|lib| serde_json::from_value::<LibraryEntry>(lib.clone()).ok())
            .find(|lib| lib.name.starts_with(&prefix))
    }

    /// Fetch the loader jar named by the profile. Returns false if it could not be fetched.
    async fn fetch_loader_jar(&self, ctx: &LoaderContext<'_>, profile: &Value) -> bool {
        let mut library = match self.loader_library(profile) {
            Some(lib) => lib,
            None => {
                warn!("{} profile lists no {} library", self.name, self.loader_artifact);
                return false;
            }
        };
        if library.url.is_none() {
            library.url = Some(self.maven.to_string());
        }

        let artifact = match library.main_artifact(&ctx.config.libraries_dir()) {
            Some(a) => a,
            None => return false,
        };
        let url = match artifact.url {
            Some(u) => u,
            None => return artifact.path.exists(),
        };

        let task = DownloadTask::new(url, &artifact.path).with_sha1(artifact.sha1.as_deref());
        match materialize(ctx.fetcher, &task).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Could not fetch {} loader jar: {}", self.name, e);
                false
            }
        }
    }

    /// Give the synthetic version a jar of its own by copying the vanilla client.
    async fn copy_vanilla_jar(&self, ctx: &LoaderContext<'_>, synthetic_id: &str) -> LauncherResult<()> {
        let source = ctx.config.version_jar_path(ctx.game_version);
        let target = ctx.config.version_jar_path(synthetic_id);
        if target.exists() {
            return Ok(());
        }
        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| LauncherError::io(&source, e))?;
        info!("Copied vanilla client jar to {:?}", target);
        Ok(())
    }
}

#[async_trait]
impl LoaderStrategy for ProfileStrategy {
    async fn prepare(&self, ctx: &LoaderContext<'_>) -> LauncherResult<String> {
        let synthetic_id = ctx.synthetic_id();
        info!(
            "Installing {} {} for Minecraft {}",
            self.name, ctx.spec.version, ctx.game_version
        );
        ctx.report(10, "Fetching loader profile");

        let url = self.profile_url(ctx.game_version, &ctx.spec.version);
        let bytes = ctx.fetcher.fetch_bytes(&url).await?;
        let mut profile: Value = serde_json::from_slice(&bytes)?;

        let object = profile.as_object_mut().ok_or_else(|| {
            LauncherError::Other(format!("{} profile at {} is not an object", self.name, url))
        })?;
        object.insert("id".into(), Value::String(synthetic_id.clone()));
        object
            .entry("inheritsFrom")
            .or_insert_with(|| Value::String(ctx.game_version.to_string()));

        let version_dir = ctx.config.version_dir(&synthetic_id);
        tokio::fs::create_dir_all(&version_dir)
            .await
            .map_err(|e| LauncherError::io(&version_dir, e))?;
        let json_path = ctx.config.version_json_path(&synthetic_id);
        tokio::fs::write(&json_path, serde_json::to_vec_pretty(&profile)?)
            .await
            .map_err(|e| LauncherError::io(&json_path, e))?;
        ctx.report(60, "Profile saved");

        if !self.fetch_loader_jar(ctx, &profile).await {
            self.copy_vanilla_jar(ctx, &synthetic_id).await?;
        }
        ctx.report(100, "Loader ready");

        info!("{} profile prepared as {}", self.name, synthetic_id);
        Ok(synthetic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LauncherConfig;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::testing::scratch_dir;
    use crate::core::events::NullSink;
    use crate::core::loaders::{LoaderKind, LoaderSpec};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn profile_urls_per_family() {
        assert_eq!(
            ProfileStrategy::QUILT.profile_url("1.20.1", "0.21.0"),
            "https://meta.quiltmc.org/v3/versions/loader/1.20.1/0.21.0/profile/json"
        );
        assert_eq!(
            ProfileStrategy::LEGACY_FABRIC.profile_url("1.8.9", "0.14.22"),
            "https://meta.legacyfabric.net/v2/versions/loader/1.8.9/0.14.22/profile/json"
        );
    }

    #[tokio::test]
    async fn missing_loader_jar_falls_back_to_vanilla_copy() {
        let root = scratch_dir("profile-fallback");
        let config = LauncherConfig::new(&root);
        std::fs::create_dir_all(config.version_dir("1.20.1")).unwrap();
        std::fs::write(config.version_jar_path("1.20.1"), b"vanilla client").unwrap();

        let strategy = ProfileStrategy::FABRIC;
        let fetcher = StaticFetcher::default().with_json(
            &strategy.profile_url("1.20.1", "0.15.0"),
            &json!({
                "id": "fabric-loader-0.15.0-1.20.1",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [{ "name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/" }]
            }),
        );
        let spec = LoaderSpec::new(LoaderKind::Fabric, "0.15.0");
        let ctx = LoaderContext {
            config: &config,
            fetcher: &fetcher,
            sink: &NullSink,
            java_bin: Path::new("java"),
            game_version: "1.20.1",
            spec: &spec,
            instance_id: None,
        };

        let id = strategy.prepare(&ctx).await.unwrap();
        assert_eq!(id, "1.20.1-fabric-0.15.0");

        let saved: Value =
            serde_json::from_slice(&std::fs::read(config.version_json_path(&id)).unwrap()).unwrap();
        assert_eq!(saved["id"], "1.20.1-fabric-0.15.0");
        assert_eq!(
            std::fs::read(config.version_jar_path(&id)).unwrap(),
            b"vanilla client"
        );
    }
}
