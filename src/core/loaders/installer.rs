// ─── Installer-based loaders ───
// Forge and NeoForge ship an installer jar. We run it headless against the
// shared data root and discover which version directory it produced.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::{LoaderContext, LoaderStrategy};
use crate::core::config::LauncherConfig;
use crate::core::downloader::{materialize, DownloadTask};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{FORGE_MAVEN, NEOFORGE_MAVEN};

const PROFILES_PLACEHOLDER: &[u8] = br#"{"profiles":{},"selectedProfile":null}"#;
const LIBRARIES_MIDPOINT: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Forge,
    NeoForge,
}

pub struct InstallerStrategy {
    family: Family,
}

impl InstallerStrategy {
    pub const FORGE: Self = Self {
        family: Family::Forge,
    };
    pub const NEOFORGE: Self = Self {
        family: Family::NeoForge,
    };

    fn name(&self) -> &'static str {
        match self.family {
            Family::Forge => "forge",
            Family::NeoForge => "neoforge",
        }
    }

    /// Candidate installer URLs, most likely first.
    pub fn installer_urls(&self, game_version: &str, loader_version: &str) -> Vec<String> {
        let prefixed = if loader_version.starts_with(&format!("{}-", game_version)) {
            loader_version.to_string()
        } else {
            format!("{}-{}", game_version, loader_version)
        };

        match self.family {
            Family::Forge => vec![format!(
                "{}/net/minecraftforge/forge/{v}/forge-{v}-installer.jar",
                FORGE_MAVEN,
                v = prefixed
            )],
            Family::NeoForge => vec![
                format!(
                    "{}/net/neoforged/neoforge/{v}/neoforge-{v}-installer.jar",
                    NEOFORGE_MAVEN,
                    v = loader_version
                ),
                // 1.20.1 builds were published under the old forge artifact.
                format!(
                    "{}/net/neoforged/forge/{v}/forge-{v}-installer.jar",
                    NEOFORGE_MAVEN,
                    v = prefixed
                ),
            ],
        }
    }

    fn best_guess_id(&self, game_version: &str, loader_version: &str) -> String {
        match self.family {
            Family::Forge => format!("{}-forge-{}", game_version, loader_version),
            Family::NeoForge => format!("neoforge-{}", loader_version),
        }
    }

    /// Pick the new version directory the installer created.
    fn pick_created(&self, before: &BTreeSet<String>, after: &BTreeSet<String>) -> Option<String> {
        let needle = match self.family {
            Family::Forge => "forge",
            Family::NeoForge => "neoforge",
        };
        let created: Vec<&String> = after.difference(before).collect();

        created
            .iter()
            .find(|id| id.to_ascii_lowercase().contains(needle))
            .or_else(|| {
                created
                    .iter()
                    .find(|id| id.to_ascii_lowercase().contains("forge"))
            })
            .map(|id| id.to_string())
    }

    async fn fetch_installer(&self, ctx: &LoaderContext<'_>) -> LauncherResult<PathBuf> {
        let mut last_err = None;
        for url in self.installer_urls(ctx.game_version, &ctx.spec.version) {
            let file_name = url.rsplit('/').next().unwrap_or("installer.jar");
            let dest = ctx.config.installers_dir().join(file_name);
            match materialize(ctx.fetcher, &DownloadTask::new(url.clone(), &dest)).await {
                Ok(_) => return Ok(dest),
                Err(e) => {
                    debug!("Installer not available at {}: {}", url, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            LauncherError::Other(format!("no installer source for {}", self.name()))
        }))
    }

    async fn run_installer(&self, ctx: &LoaderContext<'_>, installer: &Path) -> LauncherResult<()> {
        let root = ctx.config.root();
        let mut child = tokio::process::Command::new(ctx.java_bin)
            .arg("-jar")
            .arg(installer)
            .arg("--installClient")
            .arg(root)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LauncherError::io(ctx.java_bin, e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let pump_stdout = async move {
            if let Some(out) = stdout {
                let mut lines = BufReader::new(out).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "blocklaunch::installer", "{}", line);
                    if let Some(percent) = parse_installer_progress(&line) {
                        ctx.report(percent, line.trim());
                    }
                }
            }
        };
        let pump_stderr = async move {
            if let Some(err) = stderr {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "blocklaunch::installer", "{}", line);
                }
            }
        };
        let run = async {
            let (_, _, status) = tokio::join!(pump_stdout, pump_stderr, child.wait());
            status
        };

        let outcome = tokio::time::timeout(ctx.config.installer_timeout(), run).await;
        let status = match outcome {
            Ok(status) => status.map_err(|e| LauncherError::io(ctx.java_bin, e))?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(LauncherError::Timeout(format!(
                    "{} installer exceeded {:?}",
                    self.name(),
                    ctx.config.installer_timeout()
                )));
            }
        };

        if !status.success() {
            return Err(LauncherError::InstallerFailure {
                loader: self.name().to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LoaderStrategy for InstallerStrategy {
    async fn prepare(&self, ctx: &LoaderContext<'_>) -> LauncherResult<String> {
        info!(
            "Installing {} {} for Minecraft {}",
            self.name(),
            ctx.spec.version,
            ctx.game_version
        );
        ctx.report(5, "Downloading installer");
        let installer = self.fetch_installer(ctx).await?;

        ensure_profiles_placeholder(ctx.config).await?;

        let before = list_version_dirs(&ctx.config.versions_dir()).await?;
        ctx.report(20, "Running installer");
        self.run_installer(ctx, &installer).await?;
        let after = list_version_dirs(&ctx.config.versions_dir()).await?;

        let version_id = match self.pick_created(&before, &after) {
            Some(id) => id,
            None => {
                let guess = self.best_guess_id(ctx.game_version, &ctx.spec.version);
                warn!("Installer created no new version directory, assuming {}", guess);
                guess
            }
        };

        record_alias(ctx.config, &ctx.synthetic_id(), &version_id).await?;
        ctx.report(100, "Loader ready");
        info!("{} installed as {}", self.name(), version_id);
        Ok(version_id)
    }
}

/// Map an installer stdout line to loader-phase percent.
pub fn parse_installer_progress(line: &str) -> Option<u8> {
    static PROCESSOR: OnceLock<Option<Regex>> = OnceLock::new();
    let processor = PROCESSOR
        .get_or_init(|| Regex::new(r"Processor\s*(\d+)\s*/\s*(\d+)").ok())
        .as_ref()?;

    if let Some(caps) = processor.captures(line) {
        let n: u64 = caps[1].parse().ok()?;
        let m: u64 = caps[2].parse().ok()?;
        if m == 0 {
            return None;
        }
        return Some((50 + (n.min(m) * 50) / m) as u8);
    }
    if line.contains("Downloading libraries") {
        return Some(LIBRARIES_MIDPOINT);
    }
    None
}

async fn ensure_profiles_placeholder(config: &LauncherConfig) -> LauncherResult<()> {
    let path = config.profiles_file();
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(());
    }
    tokio::fs::create_dir_all(config.root())
        .await
        .map_err(|e| LauncherError::io(config.root(), e))?;
    tokio::fs::write(&path, PROFILES_PLACEHOLDER)
        .await
        .map_err(|e| LauncherError::io(&path, e))
}

async fn list_version_dirs(versions_dir: &Path) -> LauncherResult<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(versions_dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(LauncherError::io(versions_dir, e)),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(versions_dir, e))?
    {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            out.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(out)
}

async fn read_aliases(config: &LauncherConfig) -> HashMap<String, String> {
    match tokio::fs::read(config.loader_aliases_file()).await {
        Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
        Err(_) => HashMap::new(),
    }
}

async fn record_alias(config: &LauncherConfig, synthetic_id: &str, version_id: &str) -> LauncherResult<()> {
    let mut aliases = read_aliases(config).await;
    aliases.insert(synthetic_id.to_string(), version_id.to_string());
    let path = config.loader_aliases_file();
    tokio::fs::write(&path, serde_json::to_vec_pretty(&aliases)?)
        .await
        .map_err(|e| LauncherError::io(&path, e))
}

/// Installer output previously recorded for `synthetic_id`, if still on disk.
pub(crate) async fn resolve_alias(config: &LauncherConfig, synthetic_id: &str) -> Option<String> {
    let id = read_aliases(config).await.remove(synthetic_id)?;
    if config.version_json_path(&id).exists() {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::scratch_dir;

    #[test]
    fn processor_lines_map_to_upper_half() {
        assert_eq!(parse_installer_progress("  Processor 1/4"), Some(62));
        assert_eq!(parse_installer_progress("Processor 4/4"), Some(100));
        assert_eq!(parse_installer_progress("Downloading libraries"), Some(LIBRARIES_MIDPOINT));
        assert_eq!(parse_installer_progress("Extracting main jar"), None);
        assert_eq!(parse_installer_progress("Processor 1/0"), None);
    }

    #[test]
    fn forge_urls_prefix_game_version_once() {
        let urls = InstallerStrategy::FORGE.installer_urls("1.20.1", "47.2.0");
        assert_eq!(
            urls[0],
            "https://maven.minecraftforge.net/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-installer.jar"
        );
        let again = InstallerStrategy::FORGE.installer_urls("1.20.1", "1.20.1-47.2.0");
        assert_eq!(urls, again);
    }

    #[test]
    fn neoforge_has_legacy_route() {
        let urls = InstallerStrategy::NEOFORGE.installer_urls("1.20.1", "47.1.79");
        assert_eq!(urls.len(), 2);
        assert!(urls[1].contains("/net/neoforged/forge/1.20.1-47.1.79/"));
    }

    #[test]
    fn diff_prefers_matching_loader_name() {
        let before: BTreeSet<String> = ["1.20.1".to_string()].into_iter().collect();
        let after: BTreeSet<String> = ["1.20.1", "1.20.1-forge-47.2.0", "zzz-other"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            InstallerStrategy::FORGE.pick_created(&before, &after).as_deref(),
            Some("1.20.1-forge-47.2.0")
        );
        assert_eq!(InstallerStrategy::FORGE.pick_created(&after, &after), None);
        assert_eq!(
            InstallerStrategy::NEOFORGE.best_guess_id("1.20.4", "20.4.80"),
            "neoforge-20.4.80"
        );
    }

    #[tokio::test]
    async fn aliases_resolve_only_when_descriptor_exists() {
        let root = scratch_dir("installer-alias");
        let config = LauncherConfig::new(&root);
        record_alias(&config, "1.20.1-forge-47.2.0", "1.20.1-forge-47.2.0-x").await.unwrap();
        assert_eq!(resolve_alias(&config, "1.20.1-forge-47.2.0").await, None);

        std::fs::create_dir_all(config.version_dir("1.20.1-forge-47.2.0-x")).unwrap();
        std::fs::write(config.version_json_path("1.20.1-forge-47.2.0-x"), b"{}").unwrap();
        assert_eq!(
            resolve_alias(&config, "1.20.1-forge-47.2.0").await.as_deref(),
            Some("1.20.1-forge-47.2.0-x")
        );
    }
}
