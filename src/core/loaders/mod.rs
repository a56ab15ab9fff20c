// ─── Mod Loaders ───
// One variant per loader family and one dispatch table mapping each
// variant to the strategy that prepares its version descriptor.

mod context;
mod installer;
mod profile;
pub mod versions;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::LauncherResult;

pub use context::LoaderContext;
pub use installer::{parse_installer_progress, InstallerStrategy};
pub(crate) use installer::resolve_alias as installer_alias;
pub use profile::ProfileStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoaderKind {
    Forge,
    NeoForge,
    Fabric,
    Quilt,
    LegacyFabric,
    /// Any loader name the engine has no install path for.
    Unsupported(String),
}

impl LoaderKind {
    pub fn as_str(&self) -> &str {
        match self {
            LoaderKind::Forge => "forge",
            LoaderKind::NeoForge => "neoforge",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
            LoaderKind::LegacyFabric => "legacy-fabric",
            LoaderKind::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for LoaderKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "forge" => LoaderKind::Forge,
            "neoforge" => LoaderKind::NeoForge,
            "fabric" => LoaderKind::Fabric,
            "quilt" => LoaderKind::Quilt,
            "legacy-fabric" | "legacyfabric" | "legacy_fabric" => LoaderKind::LegacyFabric,
            _ => LoaderKind::Unsupported(raw),
        }
    }
}

impl From<LoaderKind> for String {
    fn from(kind: LoaderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ type, version }` attached to modded instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSpec {
    #[serde(rename = "type")]
    pub kind: LoaderKind,
    pub version: String,
}

impl LoaderSpec {
    pub fn new(kind: LoaderKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }

    /// `{gameVersion}-{loaderType}-{loaderVersion}`
    pub fn synthetic_id(&self, game_version: &str) -> String {
        format!("{}-{}-{}", game_version, self.kind, self.version)
    }
}

/// Produces an on-disk version id for a loader layered on a prepared vanilla base.
#[async_trait]
pub trait LoaderStrategy: Send + Sync {
    async fn prepare(&self, ctx: &LoaderContext<'_>) -> LauncherResult<String>;
}

static FORGE: InstallerStrategy = InstallerStrategy::FORGE;
static NEOFORGE: InstallerStrategy = InstallerStrategy::NEOFORGE;
static FABRIC: ProfileStrategy = ProfileStrategy::FABRIC;
static QUILT: ProfileStrategy = ProfileStrategy::QUILT;
static LEGACY_FABRIC: ProfileStrategy = ProfileStrategy::LEGACY_FABRIC;

/// Dispatch table. `None` means the loader cannot be installed.
pub fn strategy_for(kind: &LoaderKind) -> Option<&'static dyn LoaderStrategy> {
    match kind {
        LoaderKind::Forge => Some(&FORGE),
        LoaderKind::NeoForge => Some(&NEOFORGE),
        LoaderKind::Fabric => Some(&FABRIC),
        LoaderKind::Quilt => Some(&QUILT),
        LoaderKind::LegacyFabric => Some(&LEGACY_FABRIC),
        LoaderKind::Unsupported(_) => None,
    }
}
