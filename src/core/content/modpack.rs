// ─── Modpack Import ───
// `.mrpack` archives: a `modrinth.index.json` file list plus `overrides/`
// and `client-overrides/` trees copied over the new instance.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ContentPipeline;
use crate::core::downloader::{materialize, DownloadTask};
use crate::core::error::{LauncherError, LauncherResult, OperationResult};
use crate::core::events::{emit_log, LogLevel, ProgressCategory, ProgressEvent};
use crate::core::hash;
use crate::core::instance::{ContentCategory, ContentSource, Instance, MemoryBounds};
use crate::core::loaders::{LoaderKind, LoaderSpec};

const INDEX_FILE: &str = "modrinth.index.json";
const OVERRIDE_DIRS: [&str; 2] = ["overrides", "client-overrides"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackManifest {
    pub format_version: u32,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub version_id: String,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub files: Vec<ModpackFile>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackFile {
    pub path: String,
    #[serde(default)]
    pub hashes: HashMap<String, String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: u64,
}

impl ModpackFile {
    pub fn sha1(&self) -> Option<&str> {
        self.hashes.get("sha1").map(String::as_str)
    }

    /// Server-only files are marked `"client": "unsupported"`.
    pub fn wanted_on_client(&self) -> bool {
        self.env
            .as_ref()
            .and_then(|env| env.get("client"))
            .map(|side| side != "unsupported")
            .unwrap_or(true)
    }
}

impl ModpackManifest {
    pub fn parse(bytes: &[u8]) -> LauncherResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn game_version(&self) -> LauncherResult<&str> {
        self.dependencies
            .get("minecraft")
            .map(String::as_str)
            .ok_or_else(|| LauncherError::NotFound {
                kind: "minecraft dependency",
                id: self.name.clone(),
            })
    }

    pub fn loader(&self) -> Option<LoaderSpec> {
        const KEYS: [(&str, LoaderKind); 4] = [
            ("forge", LoaderKind::Forge),
            ("neoforge", LoaderKind::NeoForge),
            ("fabric-loader", LoaderKind::Fabric),
            ("quilt-loader", LoaderKind::Quilt),
        ];
        KEYS.into_iter().find_map(|(key, kind)| {
            self.dependencies
                .get(key)
                .map(|version| LoaderSpec::new(kind, version.clone()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModpackSource {
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackReport {
    pub instance_id: String,
    pub name: String,
    /// Entries in the pack's file list.
    pub files: usize,
    pub installed: usize,
    pub failed: Vec<String>,
}

/// Instance-relative path with no root, prefix or `..` segments.
fn safe_relative(raw: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(rel)
    }
}

fn extract_pack(archive_path: &Path, staging: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(staging).map_err(|e| LauncherError::io(staging, e))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let rel = match entry.enclosed_name() {
            Some(rel) => rel,
            None => continue,
        };
        let out_path = staging.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
    }
    Ok(())
}

/// Recursive copy that overwrites existing files. Returns the file count.
fn copy_tree(from: &Path, to: &Path) -> LauncherResult<usize> {
    if !from.is_dir() {
        return Ok(0);
    }
    std::fs::create_dir_all(to).map_err(|e| LauncherError::io(to, e))?;
    let mut copied = 0;
    for entry in std::fs::read_dir(from).map_err(|e| LauncherError::io(from, e))? {
        let entry = entry.map_err(|e| LauncherError::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        if source.is_dir() {
            copied += copy_tree(&source, &target)?;
        } else {
            std::fs::copy(&source, &target).map_err(|e| LauncherError::io(&source, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

async fn blocking<T, F>(work: F) -> LauncherResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> LauncherResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LauncherError::Other(format!("blocking task failed: {}", e)))?
}

impl ContentPipeline<'_> {
    /// Create one instance from a modpack and populate it.
    pub async fn import_modpack(
        &self,
        source: &ModpackSource,
        name: Option<&str>,
    ) -> OperationResult<ModpackReport> {
        let result = self.try_import(source, name).await;
        self.finish("modpack import", None, result)
    }

    async fn fetch_archive(&self, source: &ModpackSource) -> LauncherResult<PathBuf> {
        match source {
            ModpackSource::File(path) => Ok(path.clone()),
            ModpackSource::Url(url) => {
                let file_name = match url.rsplit('/').next().filter(|n| n.ends_with(".mrpack")) {
                    Some(name) => name.to_string(),
                    None => format!("{}.mrpack", &hash::sha1_hex(url.as_bytes())[..12]),
                };
                let dest = self.config.installers_dir().join("modpacks").join(file_name);
                materialize(self.fetcher, &DownloadTask::new(url.clone(), &dest)).await?;
                Ok(dest)
            }
        }
    }

    async fn try_import(&self, source: &ModpackSource, name: Option<&str>) -> LauncherResult<ModpackReport> {
        let archive = self.fetch_archive(source).await?;
        let staging = self
            .config
            .installers_dir()
            .join("modpack-staging")
            .join(Uuid::new_v4().to_string());

        let result = self.import_staged(&archive, &staging, name).await;
        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            debug!("Could not clean {:?}: {}", staging, e);
        }
        result
    }

    async fn import_staged(
        &self,
        archive: &Path,
        staging: &Path,
        name: Option<&str>,
    ) -> LauncherResult<ModpackReport> {
        {
            let (archive, staging) = (archive.to_path_buf(), staging.to_path_buf());
            blocking(move || extract_pack(&archive, &staging)).await?;
        }

        let index_path = staging.join(INDEX_FILE);
        let raw = tokio::fs::read(&index_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LauncherError::NotFound {
                    kind: "modpack index",
                    id: archive.display().to_string(),
                }
            } else {
                LauncherError::io(&index_path, e)
            }
        })?;
        let manifest = ModpackManifest::parse(&raw)?;
        let game_version = manifest.game_version()?.to_string();
        info!(
            "Importing modpack '{}' {} for Minecraft {} ({} files)",
            manifest.name,
            manifest.version_id,
            game_version,
            manifest.files.len()
        );

        let instance = self
            .catalog
            .create(Instance::new(
                name.unwrap_or(manifest.name.as_str()),
                game_version,
                manifest.loader(),
                MemoryBounds::default(),
                &self.config.instances_dir(),
            ))
            .await?;

        let total = manifest.files.len();
        let mut installed = 0;
        let mut failed = Vec::new();

        // One file at a time: each success rewrites the shared instance record.
        for (index, file) in manifest.files.iter().enumerate() {
            if self.install_pack_file(&instance, staging, file).await? {
                installed += 1;
            } else if file.wanted_on_client() {
                failed.push(file.path.clone());
            }
            self.sink.progress(
                ProgressEvent::counted(ProgressCategory::Modpack, (index + 1) as u64, total as u64)
                    .with_label(file.path.clone())
                    .for_instance(&instance.id),
            );
        }

        for dir in OVERRIDE_DIRS {
            let (from, to) = (staging.join(dir), instance.path.clone());
            let copied = blocking(move || copy_tree(&from, &to)).await?;
            if copied > 0 {
                info!("Copied {} files from {}/", copied, dir);
            }
        }

        Ok(ModpackReport {
            instance_id: instance.id,
            name: instance.name,
            files: total,
            installed,
            failed,
        })
    }

    /// `Ok(false)` means the file was skipped; only record-write failures abort.
    async fn install_pack_file(
        &self,
        instance: &Instance,
        staging: &Path,
        file: &ModpackFile,
    ) -> LauncherResult<bool> {
        if !file.wanted_on_client() {
            debug!("Skipping server-only {}", file.path);
            return Ok(false);
        }
        let rel = match safe_relative(&file.path) {
            Some(rel) => rel,
            None => {
                emit_log(
                    self.sink,
                    Some(&instance.id),
                    LogLevel::Warn,
                    format!("Refusing unsafe modpack path {}", file.path),
                );
                return Ok(false);
            }
        };

        let url = match file.downloads.first() {
            Some(url) => url,
            None => {
                let covered = OVERRIDE_DIRS.iter().any(|dir| staging.join(dir).join(&rel).is_file());
                if covered {
                    debug!("{} is supplied by the overrides", file.path);
                    return Ok(true);
                }
                emit_log(
                    self.sink,
                    Some(&instance.id),
                    LogLevel::Warn,
                    format!("{} has no download URL and no override; skipped", file.path),
                );
                return Ok(false);
            }
        };

        let dest = instance.path.join(&rel);
        let task = DownloadTask::new(url.clone(), &dest).with_sha1(file.sha1());
        if let Err(e) = materialize(self.fetcher, &task).await {
            if matches!(e, LauncherError::HashMismatch { .. }) {
                self.report_hash_mismatch(&instance.id, &e);
            } else {
                warn!("Modpack file {} failed: {}", file.path, e);
                emit_log(
                    self.sink,
                    Some(&instance.id),
                    LogLevel::Warn,
                    format!("{} failed: {}", file.path, e),
                );
            }
            return Ok(false);
        }

        // Only direct children of a content folder become records.
        let category = match ContentCategory::from_relative_path(&file.path) {
            Some(c) if rel.components().count() == 2 => c,
            _ => return Ok(true),
        };
        let record = self.describe_file(&dest, true, ContentSource::Modpack).await;
        self.catalog
            .update(&instance.id, Box::new(move |i| i.upsert_content(category, record)))
            .await?;
        Ok(true)
    }
}
