use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderSpec;

/// Per-category content folders inside an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Mods,
    ResourcePacks,
    ShaderPacks,
    DataPacks,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Mods,
        ContentCategory::ResourcePacks,
        ContentCategory::ShaderPacks,
        ContentCategory::DataPacks,
    ];

    pub fn folder(self) -> &'static str {
        match self {
            ContentCategory::Mods => "mods",
            ContentCategory::ResourcePacks => "resourcepacks",
            ContentCategory::ShaderPacks => "shaderpacks",
            ContentCategory::DataPacks => "datapacks",
        }
    }

    /// Sibling folder holding disabled items, e.g. `disabledmods`.
    pub fn disabled_folder(self) -> String {
        format!("disabled{}", self.folder())
    }

    /// Registry project types: `mod`, `resourcepack`, `shader`, `datapack`.
    pub fn from_project_type(project_type: &str) -> Option<Self> {
        match project_type {
            "mod" | "mods" => Some(ContentCategory::Mods),
            "resourcepack" | "resourcepacks" => Some(ContentCategory::ResourcePacks),
            "shader" | "shaderpack" | "shaderpacks" => Some(ContentCategory::ShaderPacks),
            "datapack" | "datapacks" => Some(ContentCategory::DataPacks),
            _ => None,
        }
    }

    /// Category implied by the first segment of an instance-relative path.
    pub fn from_relative_path(path: &str) -> Option<Self> {
        let first = path.split(['/', '\\']).next()?;
        Self::ALL.into_iter().find(|c| c.folder() == first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Modrinth,
    Modpack,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub version: String,
    pub file_name: String,
    pub enabled: bool,
    pub source: ContentSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBounds {
    pub min_mb: u32,
    pub max_mb: u32,
}

impl Default for MemoryBounds {
    fn default() -> Self {
        Self {
            min_mb: 1024,
            max_mb: 4096,
        }
    }
}

/// One instance record in `instances.json`.
///
/// The instance folder holds `mods/`, `disabledmods/`, `resourcepacks/`,
/// `shaderpacks/`, `datapacks/`, `config/`, `saves/`, `logs/` and
/// `crash-reports/`. The game runs with the folder as working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    /// Base game version.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderSpec>,
    #[serde(default)]
    pub memory: MemoryBounds,
    pub path: PathBuf,
    #[serde(default)]
    pub mods: Vec<ContentMetadata>,
    #[serde(default)]
    pub resourcepacks: Vec<ContentMetadata>,
    #[serde(default)]
    pub shaderpacks: Vec<ContentMetadata>,
    #[serde(default)]
    pub datapacks: Vec<ContentMetadata>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
}

const LAYOUT: [&str; 9] = [
    "mods",
    "disabledmods",
    "resourcepacks",
    "shaderpacks",
    "datapacks",
    "config",
    "saves",
    "logs",
    "crash-reports",
];

impl Instance {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        loader: Option<LoaderSpec>,
        memory: MemoryBounds,
        instances_dir: &Path,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            path: instances_dir.join(&id),
            id,
            name: name.into(),
            version: version.into(),
            loader,
            memory,
            mods: Vec::new(),
            resourcepacks: Vec::new(),
            shaderpacks: Vec::new(),
            datapacks: Vec::new(),
            created_at: Utc::now(),
            last_played: None,
        }
    }

    pub fn content(&self, category: ContentCategory) -> &Vec<ContentMetadata> {
        match category {
            ContentCategory::Mods => &self.mods,
            ContentCategory::ResourcePacks => &self.resourcepacks,
            ContentCategory::ShaderPacks => &self.shaderpacks,
            ContentCategory::DataPacks => &self.datapacks,
        }
    }

    pub fn content_mut(&mut self, category: ContentCategory) -> &mut Vec<ContentMetadata> {
        match category {
            ContentCategory::Mods => &mut self.mods,
            ContentCategory::ResourcePacks => &mut self.resourcepacks,
            ContentCategory::ShaderPacks => &mut self.shaderpacks,
            ContentCategory::DataPacks => &mut self.datapacks,
        }
    }

    /// Insert or replace the record with the same file name.
    pub fn upsert_content(&mut self, category: ContentCategory, record: ContentMetadata) {
        let list = self.content_mut(category);
        match list.iter_mut().find(|m| m.file_name == record.file_name) {
            Some(existing) => *existing = record,
            None => list.push(record),
        }
    }

    pub fn content_dir(&self, category: ContentCategory) -> PathBuf {
        self.path.join(category.folder())
    }

    pub fn disabled_dir(&self, category: ContentCategory) -> PathBuf {
        self.path.join(category.disabled_folder())
    }

    /// Extracted per launch.
    pub fn natives_dir(&self) -> PathBuf {
        self.path.join("natives")
    }

    pub async fn ensure_layout(&self) -> LauncherResult<()> {
        for sub in LAYOUT {
            let dir = self.path.join(sub);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| LauncherError::io(&dir, e))?;
        }
        Ok(())
    }
}
