use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{info, warn};

use super::extract::{extract_runtime_archive, locate_java_binary, mark_executable};
use super::{required_java_major, runtime_build, RuntimeBuild};
use crate::core::config::LauncherConfig;
use crate::core::downloader::Fetcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, ProgressCategory, ProgressEvent};
use crate::core::rules::Platform;

pub struct JavaProvisioner<'a> {
    config: &'a LauncherConfig,
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn EventSink,
    platform: Platform,
    instance_id: Option<&'a str>,
}

impl<'a> JavaProvisioner<'a> {
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

    fn report(&self, percent: u8, label: &str) {
        let mut event = ProgressEvent::percent(ProgressCategory::Java, percent).with_label(label);
        if let Some(id) = self.instance_id {
            event = event.for_instance(id);
        }
        self.sink.progress(event);
    }

    pub fn runtime_root(&self, build: &RuntimeBuild) -> PathBuf {
        self.config.runtimes_dir().join(build.release)
    }

    /// Path to a `java` executable able to run `game_version`, downloading
    /// and unpacking the pinned runtime when it is not already on disk.
    pub async fn ensure_for_game(&self, game_version: &str) -> LauncherResult<PathBuf> {
        let major = required_java_major(game_version);
        info!("Minecraft {} requires Java {}", game_version, major);
        self.ensure_major(major).await
    }

    pub async fn ensure_major(&self, major: u32) -> LauncherResult<PathBuf> {
        let build = runtime_build(major)
            .ok_or_else(|| LauncherError::Unsupported(format!("no runtime build for Java {}", major)))?;
        let runtime_root = self.runtime_root(&build);

        if let Some(java) = locate_java_binary(&runtime_root) {
            info!("Using existing Java runtime {:?}", java);
            return Ok(java);
        }

        let url = build.archive_url(&self.platform)?;
        let runtimes_dir = self.config.runtimes_dir();
        tokio::fs::create_dir_all(&runtimes_dir)
            .await
            .map_err(|e| LauncherError::io(&runtimes_dir, e))?;
        ensure_min_disk_space(&runtimes_dir, self.config.tunables().runtime_min_free_mb * 1024 * 1024)?;

        let archive_path = runtimes_dir.join(format!(
            "{}.{}",
            build.release,
            build.archive_extension(&self.platform)
        ));
        info!("Downloading Java {} runtime from {}", major, url);
        self.report(0, &format!("Downloading Java {}", major));

        let last_percent = AtomicU8::new(0);
        let on_bytes = |done: u64, total: Option<u64>| {
            let total = match total {
                Some(t) if t > 0 => t,
                _ => return,
            };
            let percent = ((done.min(total) * 80) / total) as u8;
            if last_percent.swap(percent, Ordering::Relaxed) != percent {
                self.report(percent, "Downloading runtime");
            }
        };
        self.fetcher.download(&url, &archive_path, Some(&on_bytes)).await?;

        self.report(85, "Extracting runtime");
        let archive = archive_path.clone();
        let root = runtime_root.clone();
        tokio::task::spawn_blocking(move || extract_runtime_archive(&archive, &root))
            .await
            .map_err(|e| LauncherError::Other(format!("runtime extraction task failed: {}", e)))??;

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!("Could not remove runtime archive {:?}: {}", archive_path, e);
        }

        let java = locate_java_binary(&runtime_root).ok_or_else(|| LauncherError::NotFound {
            kind: "java executable",
            id: runtime_root.display().to_string(),
        })?;
        mark_executable(&java)?;

        self.report(100, "Java ready");
        info!("Java {} runtime installed at {:?}", major, java);
        Ok(java)
    }
}

fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> LauncherResult<()> {
    if minimum_bytes == 0 {
        return Ok(());
    }
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }
    match available {
        Some(bytes) if bytes < minimum_bytes => Err(LauncherError::Other(format!(
            "not enough disk space for a Java runtime: available={} required={}",
            bytes, minimum_bytes
        ))),
        _ => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::config::Tunables;
    use crate::core::downloader::testing::StaticFetcher;
    use crate::core::events::testing::RecordingSink;
    use crate::core::testing::scratch_dir;

    fn fake_runtime_tar_gz(top: &str) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let body = b"#!/bin/sh\necho fake\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/bin/java", top), &body[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[tokio::test]
    async fn downloads_once_then_reuses_extracted_runtime() {
        use std::os::unix::fs::PermissionsExt;

        let root = scratch_dir("java-provision");
        let config = LauncherConfig::new(&root).with_tunables(Tunables {
            runtime_min_free_mb: 0,
            ..Tunables::default()
        });
        let linux = Platform {
            os: "linux",
            arch: "x86_64",
        };
        let build = runtime_build(17).unwrap();
        let fetcher = StaticFetcher::default().with_route(
            &build.archive_url(&linux).unwrap(),
            &fake_runtime_tar_gz("jdk-17.0.10+7-jre"),
        );
        let sink = RecordingSink::default();
        let provisioner = JavaProvisioner::new(&config, &fetcher, &sink).with_platform(linux);

        let java = provisioner.ensure_for_game("1.20.1").await.unwrap();
        assert_eq!(
            java,
            config.runtimes_dir().join("jdk-17.0.10+7").join("bin").join("java")
        );
        let mode = std::fs::metadata(&java).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(!config.runtimes_dir().join("jdk-17.0.10+7.tar.gz").exists());
        assert!(sink
            .progress_in(ProgressCategory::Java)
            .iter()
            .any(|p| p.percent == 100));

        let again = provisioner.ensure_for_game("1.18.2").await.unwrap();
        assert_eq!(again, java);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn archive_without_java_is_fatal() {
        let root = scratch_dir("java-broken");
        let config = LauncherConfig::new(&root).with_tunables(Tunables {
            runtime_min_free_mb: 0,
            ..Tunables::default()
        });
        let linux = Platform {
            os: "linux",
            arch: "x86_64",
        };
        let build = runtime_build(8).unwrap();

        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk8u402-b06-jre/README", &b"hi\n"[..])
            .unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let fetcher = StaticFetcher::default().with_route(&build.archive_url(&linux).unwrap(), &archive);
        let sink = RecordingSink::default();
        let err = JavaProvisioner::new(&config, &fetcher, &sink)
            .with_platform(linux)
            .ensure_for_game("1.12.2")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::NotFound { kind: "java executable", .. }));
    }
}
