// ─── Launcher Configuration ───
// Immutable path layout and tunables, built once at startup and shared
// by reference. Changing the root produces a new value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const APP_DIR_NAME: &str = "blocklaunch";
const BOOTSTRAP_FILE: &str = "launcher_bootstrap.json";
const CONFIG_FILE: &str = "launcher_config.json";
const DATA_DIR_ENV: &str = "BLOCKLAUNCH_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapConfig {
    data_dir: PathBuf,
}

/// Overridable knobs, read from `launcher_config.json` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub asset_workers: usize,
    pub library_workers: usize,
    pub detect_workers: usize,
    /// Emit one asset progress event per this many completions.
    pub progress_cadence: usize,
    pub http_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub installer_timeout_secs: u64,
    pub probe_host: String,
    pub probe_timeout_secs: u64,
    /// Free space required before a runtime archive is downloaded.
    pub runtime_min_free_mb: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            asset_workers: 10,
            library_workers: 8,
            detect_workers: 2,
            progress_cadence: 50,
            http_timeout_secs: 120,
            connect_timeout_secs: 15,
            installer_timeout_secs: 600,
            probe_host: "piston-meta.mojang.com:443".into(),
            probe_timeout_secs: 5,
            runtime_min_free_mb: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LauncherConfig {
    root: PathBuf,
    tunables: Tunables,
}

impl LauncherConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tunables: Tunables::default(),
        }
    }

    /// Resolve the data root from the environment, the bootstrap pointer
    /// file, or the platform data dir, then apply `launcher_config.json`.
    pub fn load() -> Self {
        let root = resolve_data_dir();
        let tunables = load_tunables(&root).unwrap_or_default();
        debug!("Launcher data root: {:?}", root);
        Self { root, tunables }
    }

    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tunables: self.tunables.clone(),
        }
    }

    pub fn with_tunables(&self, tunables: Tunables) -> Self {
        Self {
            root: self.root.clone(),
            tunables,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    pub fn version_json_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}.json", version_id))
    }

    pub fn version_jar_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{}.jar", version_id))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn runtimes_dir(&self) -> PathBuf {
        self.root.join("java-runtimes")
    }

    pub fn installers_dir(&self) -> PathBuf {
        self.root.join("installers")
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.root.join("instances")
    }

    /// Single metadata document shared by every instance.
    pub fn instances_file(&self) -> PathBuf {
        self.root.join("instances.json")
    }

    /// Placeholder the Forge/NeoForge installers insist on.
    pub fn profiles_file(&self) -> PathBuf {
        self.root.join("launcher_profiles.json")
    }

    pub fn loader_aliases_file(&self) -> PathBuf {
        self.root.join("loader_aliases.json")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.tunables.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.tunables.connect_timeout_secs)
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.tunables.installer_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.tunables.probe_timeout_secs)
    }

    pub fn launcher_name(&self) -> &'static str {
        "blocklaunch"
    }

    pub fn launcher_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_data_dir() -> PathBuf {
    if let Ok(raw) = std::env::var(DATA_DIR_ENV) {
        if !raw.trim().is_empty() {
            return PathBuf::from(raw);
        }
    }

    let base = default_base_dir();
    let bootstrap_path = base.join(BOOTSTRAP_FILE);
    if let Ok(raw) = std::fs::read_to_string(&bootstrap_path) {
        match serde_json::from_str::<BootstrapConfig>(&raw) {
            Ok(cfg) => return cfg.data_dir,
            Err(e) => warn!("Ignoring malformed {:?}: {}", bootstrap_path, e),
        }
    }

    base.join(APP_DIR_NAME)
}

fn load_tunables(root: &Path) -> Option<Tunables> {
    let raw = std::fs::read_to_string(root.join(CONFIG_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", CONFIG_FILE, e);
            None
        }
    }
}
