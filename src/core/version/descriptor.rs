// ─── Version Descriptor ───
// Typed form of a version JSON (vanilla, loader profile, or installer output)
// plus inheritance merging.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenCoordinate, MOJANG_LIBRARIES};
use crate::core::rules::{self, Platform, Rule};

const MAX_INHERITANCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Legacy single-string game arguments (pre-1.13).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentEntry>,
    #[serde(default)]
    pub jvm: Vec<ArgumentEntry>,
}

/// A literal argument or a rule-guarded one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentEntry {
    Literal(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

impl ArgumentEntry {
    /// Tokens this entry contributes on `platform`.
    pub fn tokens_for(&self, platform: &Platform) -> Vec<String> {
        match self {
            ArgumentEntry::Literal(s) => vec![s.clone()],
            ArgumentEntry::Conditional { rules, value } => {
                if !rules::evaluate(Some(rules), platform) {
                    return Vec::new();
                }
                match value {
                    ArgumentValue::One(s) => vec![s.clone()],
                    ArgumentValue::Many(v) => v.clone(),
                }
            }
        }
    }
}

pub fn flatten_arguments(entries: &[ArgumentEntry], platform: &Platform) -> Vec<String> {
    entries.iter().flat_map(|e| e.tokens_for(platform)).collect()
}

// ─── Libraries ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// Repository base for loader profiles that omit `downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    /// OS name → classifier key, e.g. `"windows": "natives-windows-${arch}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<HashMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: String,
}

/// Where a library (or one of its classifiers) lives locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub path: PathBuf,
    /// `None` when no URL is known; the artifact must already be on disk.
    pub url: Option<String>,
    pub sha1: Option<String>,
}

fn classifier_aliases(os: &str) -> &'static [&'static str] {
    match os {
        "osx" => &["natives-osx", "natives-macos"],
        "windows" => &["natives-windows", "natives-windows-64", "natives-windows-x86_64"],
        _ => &["natives-linux"],
    }
}

impl LibraryEntry {
    pub fn applies_to(&self, platform: &Platform) -> bool {
        rules::evaluate(self.rules.as_deref(), platform)
    }

    pub fn coordinate(&self) -> LauncherResult<MavenCoordinate> {
        MavenCoordinate::parse(&self.name)
    }

    /// True for `group:artifact:version:natives-*` entries (LWJGL 3 style).
    pub fn is_native_coordinate(&self) -> bool {
        self.coordinate()
            .ok()
            .and_then(|c| c.classifier)
            .map(|c| c.starts_with("natives-"))
            .unwrap_or(false)
    }

    /// Main artifact, or `None` for classifier-only entries.
    pub fn main_artifact(&self, libraries_dir: &Path) -> Option<ResolvedArtifact> {
        let artifact = self.downloads.as_ref().and_then(|d| d.artifact.as_ref());

        if let Some(artifact) = artifact {
            let path = match &artifact.path {
                Some(p) => libraries_dir.join(p),
                None => libraries_dir.join(self.coordinate().ok()?.local_path()),
            };
            let url = Some(artifact.url.clone()).filter(|u| !u.is_empty());
            return Some(ResolvedArtifact {
                path,
                url,
                sha1: artifact.sha1.clone(),
            });
        }

        // Old natives-only entries carry classifiers but no main jar.
        let has_classifiers = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .map(|c| !c.is_empty())
            .unwrap_or(false);
        if self.natives.is_some() && has_classifiers {
            return None;
        }

        let coord = self.coordinate().ok()?;
        let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        Some(ResolvedArtifact {
            path: libraries_dir.join(coord.local_path()),
            url: Some(coord.url_in(repo)),
            sha1: None,
        })
    }

    /// Classifier key for `platform`: the declared key first, then known aliases.
    pub fn native_classifier(&self, platform: &Platform) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let classifiers = self.downloads.as_ref().and_then(|d| d.classifiers.as_ref());
        let bits = if platform.arch == "x86" { "32" } else { "64" };

        if let Some(declared) = natives.get(platform.os) {
            let key = declared.replace("${arch}", bits);
            match classifiers {
                Some(c) if !c.contains_key(&key) => {}
                _ => return Some(key),
            }
        }

        let classifiers = classifiers?;
        classifier_aliases(platform.os)
            .iter()
            .find(|alias| classifiers.contains_key(**alias))
            .map(|alias| alias.to_string())
    }

    pub fn native_artifact(
        &self,
        libraries_dir: &Path,
        platform: &Platform,
    ) -> Option<ResolvedArtifact> {
        let key = self.native_classifier(platform)?;
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(&key));

        let coord = self.coordinate().ok()?.with_classifier(&key);
        match declared {
            Some(artifact) => Some(ResolvedArtifact {
                path: match &artifact.path {
                    Some(p) => libraries_dir.join(p),
                    None => libraries_dir.join(coord.local_path()),
                },
                url: Some(artifact.url.clone()).filter(|u| !u.is_empty()),
                sha1: artifact.sha1.clone(),
            }),
            None => {
                let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
                Some(ResolvedArtifact {
                    path: libraries_dir.join(coord.local_path()),
                    url: Some(coord.url_in(repo)),
                    sha1: None,
                })
            }
        }
    }
}

// ─── Loading & merging ───

impl VersionDescriptor {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn load(config: &LauncherConfig, version_id: &str) -> LauncherResult<Self> {
        let path = config.version_json_path(version_id);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LauncherError::NotFound {
                    kind: "version descriptor",
                    id: version_id.to_string(),
                }
            } else {
                LauncherError::io(&path, e)
            }
        })?;
        Self::parse(&raw)
    }

    /// Load `version_id` and fold in every ancestor named by `inheritsFrom`.
    pub async fn load_effective(config: &LauncherConfig, version_id: &str) -> LauncherResult<Self> {
        let mut chain = vec![Self::load(config, version_id).await?];

        while let Some(parent) = chain.last().and_then(|d| d.inherits_from.clone()) {
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                return Err(LauncherError::Other(format!(
                    "inheritsFrom chain for {} is deeper than {}",
                    version_id, MAX_INHERITANCE_DEPTH
                )));
            }
            debug!("{} inherits from {}", chain[chain.len() - 1].id, parent);
            chain.push(Self::load(config, &parent).await?);
        }

        let mut effective = match chain.pop() {
            Some(root) => root,
            None => return Err(LauncherError::Other("empty descriptor chain".into())),
        };
        while let Some(child) = chain.pop() {
            effective = merge(effective, child);
        }
        Ok(effective)
    }

    /// Id of the version whose client jar goes on the classpath.
    pub fn game_jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    pub fn assets_index_name(&self) -> String {
        self.asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| self.assets.clone())
            .unwrap_or_else(|| "legacy".to_string())
    }
}

/// Fold `custom` onto `base`. Libraries and per-phase arguments are
/// concatenated base-first without dedup; custom scalars win when present.
pub fn merge(base: VersionDescriptor, custom: VersionDescriptor) -> VersionDescriptor {
    let mut libraries = base.libraries;
    libraries.extend(custom.libraries);

    let arguments = match (base.arguments, custom.arguments) {
        (None, None) => None,
        (Some(a), None) | (None, Some(a)) => Some(a),
        (Some(mut a), Some(b)) => {
            a.jvm.extend(b.jvm);
            a.game.extend(b.game);
            Some(a)
        }
    };

    VersionDescriptor {
        jar: custom.jar.or(base.jar).or_else(|| Some(base.id.clone())),
        id: custom.id,
        inherits_from: None,
        main_class: custom.main_class.or(base.main_class),
        version_type: custom.version_type.or(base.version_type),
        libraries,
        downloads: custom.downloads.or(base.downloads),
        asset_index: custom.asset_index.or(base.asset_index),
        assets: custom.assets.or(base.assets),
        arguments,
        minecraft_arguments: custom.minecraft_arguments.or(base.minecraft_arguments),
        java_version: custom.java_version.or(base.java_version),
    }
}
