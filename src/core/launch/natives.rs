// ─── Native Extractor ───
// Unpacks platform native jars into a per-launch `natives/` directory.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::core::config::LauncherConfig;
use crate::core::downloader::{materialize, DownloadTask, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{emit_log, EventSink, LogLevel};
use crate::core::maven::{MavenCoordinate, MOJANG_LIBRARIES};
use crate::core::rules::Platform;
use crate::core::version::VersionDescriptor;

const NATIVE_EXTENSIONS: [&str; 4] = [".dll", ".so", ".dylib", ".jnilib"];
const LEGACY_LWJGL: &str = "org.lwjgl.lwjgl:lwjgl-platform:2.9.4-nightly-20150209";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativesReport {
    pub dir: PathBuf,
    pub extracted: usize,
    pub critical_present: bool,
}

fn os_classifier_prefixes(os: &str) -> &'static [&'static str] {
    match os {
        "windows" => &["natives-windows"],
        "osx" => &["natives-osx", "natives-macos"],
        _ => &["natives-linux"],
    }
}

/// File names of which at least one must exist for LWJGL to load.
fn critical_natives(os: &str) -> &'static [&'static str] {
    match os {
        "windows" => &["lwjgl.dll", "lwjgl64.dll", "lwjgl32.dll"],
        "osx" => &["liblwjgl.dylib", "liblwjgl.jnilib"],
        _ => &["liblwjgl.so", "liblwjgl64.so"],
    }
}

/// True for 1.12.2 and older releases, which ship LWJGL 2.
pub fn uses_legacy_lwjgl(game_version: &str) -> bool {
    let mut parts = game_version
        .split('.')
        .map(|p| p.parse::<u32>().ok());
    match (parts.next(), parts.next()) {
        (Some(Some(1)), Some(Some(minor))) => minor <= 12,
        _ => false,
    }
}

fn is_native_file(name: &str) -> bool {
    NATIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Best effort: a locked stale file must not stop the launch.
async fn clear_dir(dir: &Path) {
    if tokio::fs::remove_dir_all(dir).await.is_ok() {
        return;
    }
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                debug!("Keeping stale native {:?}: {}", entry.path(), e);
            }
        }
    }
}

/// Copy every native binary in `jar` into `dest`, flattened. Blocking.
fn extract_jar(jar: &Path, dest: &Path) -> LauncherResult<usize> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut count = 0;

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = entry.name().to_string();
        if entry.is_dir() || name.starts_with("META-INF") || !is_native_file(&name) {
            continue;
        }
        let file_name = match Path::new(&name).file_name() {
            Some(f) => f.to_owned(),
            None => continue,
        };
        let out_path = dest.join(file_name);
        let mut out = match std::fs::File::create(&out_path) {
            Ok(f) => f,
            Err(e) => {
                debug!("Cannot write native {:?}: {}", out_path, e);
                continue;
            }
        };
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        count += 1;
    }
    Ok(count)
}

pub struct NativeExtractor<'a> {
    config: &'a LauncherConfig,
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn EventSink,
    platform: Platform,
    instance_id: Option<&'a str>,
}

impl<'a> NativeExtractor<'a> {
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

    /// Native jars on disk for this platform: declared classifier artifacts
    /// plus `natives-*` coordinates.
    pub fn native_jars(&self, descriptor: &VersionDescriptor) -> Vec<PathBuf> {
        let libs = self.config.libraries_dir();
        let prefixes = os_classifier_prefixes(self.platform.os);
        let mut jars: Vec<PathBuf> = Vec::new();

        for library in descriptor.libraries.iter().filter(|l| l.applies_to(&self.platform)) {
            let candidate = if let Some(native) = library.native_artifact(&libs, &self.platform) {
                Some(native.path)
            } else if library.is_native_coordinate() {
                let matches_os = library
                    .coordinate()
                    .ok()
                    .and_then(|c| c.classifier)
                    .map(|c| prefixes.iter().any(|p| c.starts_with(p)))
                    .unwrap_or(false);
                if matches_os {
                    library.main_artifact(&libs).map(|a| a.path)
                } else {
                    None
                }
            } else {
                None
            };

            if let Some(path) = candidate {
                if path.exists() && !jars.contains(&path) {
                    jars.push(path);
                }
            }
        }
        jars
    }

    pub async fn extract(
        &self,
        descriptor: &VersionDescriptor,
        natives_dir: &Path,
        game_version: &str,
    ) -> LauncherResult<NativesReport> {
        clear_dir(natives_dir).await;
        tokio::fs::create_dir_all(natives_dir)
            .await
            .map_err(|e| LauncherError::io(natives_dir, e))?;

        let mut extracted = 0;
        for jar in self.native_jars(descriptor) {
            extracted += self.extract_one(jar, natives_dir).await;
        }

        let mut critical_present = self.has_critical(natives_dir);
        if !critical_present && uses_legacy_lwjgl(game_version) {
            warn!("LWJGL natives missing for {}, trying legacy set", game_version);
            if let Some(jar) = self.fetch_legacy_natives().await {
                extracted += self.extract_one(jar, natives_dir).await;
                critical_present = self.has_critical(natives_dir);
            }
        }

        if !critical_present {
            let message = format!(
                "No LWJGL native library found in {:?}; the game will likely fail to start",
                natives_dir
            );
            error!("{}", message);
            emit_log(self.sink, self.instance_id, LogLevel::Error, message);
        }

        info!("Extracted {} native files into {:?}", extracted, natives_dir);
        Ok(NativesReport {
            dir: natives_dir.to_path_buf(),
            extracted,
            critical_present,
        })
    }

    async fn extract_one(&self, jar: PathBuf, natives_dir: &Path) -> usize {
        let dest = natives_dir.to_path_buf();
        let source = jar.clone();
        match tokio::task::spawn_blocking(move || extract_jar(&source, &dest)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("Cannot extract natives from {:?}: {}", jar, e);
                0
            }
            Err(e) => {
                warn!("Native extraction task failed for {:?}: {}", jar, e);
                0
            }
        }
    }

    fn has_critical(&self, natives_dir: &Path) -> bool {
        critical_natives(self.platform.os)
            .iter()
            .any(|name| natives_dir.join(name).is_file())
    }

    async fn fetch_legacy_natives(&self) -> Option<PathBuf> {
        let classifier = os_classifier_prefixes(self.platform.os)[0];
        let coord = MavenCoordinate::parse(LEGACY_LWJGL).ok()?.with_classifier(classifier);
        let dest = self.config.libraries_dir().join(coord.local_path());
        let task = DownloadTask::new(coord.url_in(MOJANG_LIBRARIES), &dest);
        match materialize(self.fetcher, &task).await {
            Ok(_) => Some(dest),
            Err(e) => {
                warn!("Legacy LWJGL natives unavailable: {}", e);
                None
            }
        }
    }
}
