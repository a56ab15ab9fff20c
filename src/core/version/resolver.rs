// ─── Version Resolver ───
// Turns (game version, optional loader) into a version id that exists on
// disk. Loader problems degrade to the plain game version and are reported
// through `Resolution::warning` instead of failing the launch.

use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use super::descriptor::VersionDescriptor;
use super::manifest::VersionManifest;
use crate::core::config::LauncherConfig;
use crate::core::downloader::{materialize, DownloadTask, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{emit_log, EventSink, LogLevel, ProgressCategory, ProgressEvent};
use crate::core::hash;
use crate::core::loaders::{self, LoaderContext, LoaderSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub version_id: String,
    /// Set when a requested loader could not be prepared.
    pub warning: Option<String>,
}

impl Resolution {
    fn plain(version_id: impl Into<String>) -> Self {
        Self {
            version_id: version_id.into(),
            warning: None,
        }
    }
}

pub struct VersionResolver<'a> {
    config: &'a LauncherConfig,
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn EventSink,
    instance_id: Option<&'a str>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(config: &'a LauncherConfig, fetcher: &'a dyn Fetcher, sink: &'a dyn EventSink) -> Self {
        Self {
            config,
            fetcher,
            sink,
            instance_id: None,
        }
    }

    pub fn for_instance(mut self, instance_id: &'a str) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    fn report(&self, percent: u8, label: &str) {
        let mut event = ProgressEvent::percent(ProgressCategory::Minecraft, percent).with_label(label);
        if let Some(id) = self.instance_id {
            event = event.for_instance(id);
        }
        self.sink.progress(event);
    }

    /// Ensure the vanilla descriptor JSON and client jar for `game_version` exist.
    pub async fn prepare_vanilla(&self, game_version: &str) -> LauncherResult<VersionDescriptor> {
        let json_path = self.config.version_json_path(game_version);
        let jar_path = self.config.version_jar_path(game_version);

        let descriptor = if json_path.exists() {
            VersionDescriptor::load(self.config, game_version).await?
        } else {
            self.report(0, "Fetching version manifest");
            let manifest = VersionManifest::fetch(self.fetcher).await?;
            let entry = manifest
                .find_version(game_version)
                .ok_or_else(|| LauncherError::VersionNotFound(game_version.to_string()))?;

            let raw = self.fetcher.fetch_bytes(&entry.url).await?;
            if let Some(expected) = &entry.sha1 {
                let actual = hash::sha1_hex(&raw);
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(LauncherError::HashMismatch {
                        path: json_path,
                        algorithm: "SHA-1",
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
            let descriptor: VersionDescriptor = serde_json::from_slice(&raw)?;

            let dir = self.config.version_dir(game_version);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| LauncherError::io(&dir, e))?;
            tokio::fs::write(&json_path, &raw)
                .await
                .map_err(|e| LauncherError::io(&json_path, e))?;
            self.report(30, "Version descriptor saved");
            descriptor
        };

        if !jar_path.exists() {
            let client = descriptor
                .downloads
                .as_ref()
                .and_then(|d| d.client.as_ref())
                .ok_or_else(|| LauncherError::NotFound {
                    kind: "client download",
                    id: game_version.to_string(),
                })?;
            self.report(40, "Downloading client jar");
            let task = DownloadTask::new(client.url.clone(), &jar_path).with_sha1(client.sha1.as_deref());
            materialize(self.fetcher, &task).await?;
        }

        self.report(100, "Minecraft ready");
        Ok(descriptor)
    }

    /// Resolve the id to launch. Vanilla failures propagate; loader failures degrade.
    pub async fn prepare_custom_version(
        &self,
        game_version: &str,
        loader: Option<&LoaderSpec>,
        java_bin: &Path,
    ) -> LauncherResult<Resolution> {
        let spec = match loader {
            Some(spec) => spec,
            None => {
                self.prepare_vanilla(game_version).await?;
                return Ok(Resolution::plain(game_version));
            }
        };

        let synthetic_id = spec.synthetic_id(game_version);
        if self.config.version_json_path(&synthetic_id).exists() {
            info!("{} already prepared", synthetic_id);
            return Ok(Resolution::plain(synthetic_id));
        }
        if let Some(id) = loaders::installer_alias(self.config, &synthetic_id).await {
            info!("{} already installed as {}", synthetic_id, id);
            return Ok(Resolution::plain(id));
        }

        self.prepare_vanilla(game_version).await?;

        let strategy = match loaders::strategy_for(&spec.kind) {
            Some(s) => s,
            None => {
                let err = LauncherError::Unsupported(format!("loader type {}", spec.kind));
                return Ok(self.degrade(game_version, err));
            }
        };

        let ctx = LoaderContext {
            config: self.config,
            fetcher: self.fetcher,
            sink: self.sink,
            java_bin,
            game_version,
            spec,
            instance_id: self.instance_id,
        };

        match strategy.prepare(&ctx).await {
            Ok(id) => Ok(Resolution::plain(id)),
            Err(e) => Ok(self.degrade(game_version, e)),
        }
    }

    fn degrade(&self, game_version: &str, err: LauncherError) -> Resolution {
        let message = format!(
            "Loader preparation failed, continuing with vanilla {}: {}",
            game_version, err
        );
        match err {
            LauncherError::Unsupported(_) => {
                warn!("{}", message);
                emit_log(self.sink, self.instance_id, LogLevel::Warn, message.clone());
            }
            _ => {
                error!("{}", message);
                emit_log(self.sink, self.instance_id, LogLevel::Error, message.clone());
            }
        }
        Resolution {
            version_id: game_version.to_string(),
            warning: Some(message),
        }
    }
}
