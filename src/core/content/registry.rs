// ─── Content Registry ───
// Remote catalog of mods, packs and shaders. Search responses are handed
// back untouched; everything the engine acts on is typed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::downloader::{fetch_json, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ContentCategory;
use crate::core::loaders::LoaderKind;

pub const MODRINTH_API: &str = "https://api.modrinth.com/v2";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    /// Raw facet expression, e.g. `[["project_type:mod"],["versions:1.20.1"]]`.
    #[serde(default)]
    pub facets: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryProject {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    pub project_type: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub hashes: HashMap<String, String>,
    #[serde(default)]
    pub size: u64,
}

impl RegistryFile {
    pub fn sha1(&self) -> Option<&str> {
        self.hashes.get("sha1").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryVersion {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    pub version_number: String,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub files: Vec<RegistryFile>,
    #[serde(default)]
    pub date_published: String,
}

impl RegistryVersion {
    /// The primary file, or the first one when none is flagged.
    pub fn primary_file(&self) -> Option<&RegistryFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }
}

#[derive(Debug, Deserialize)]
struct TeamMember {
    user: TeamUser,
}

#[derive(Debug, Deserialize)]
struct TeamUser {
    username: String,
}

/// Search, version listing and hash lookup against a content catalog.
#[async_trait]
pub trait ContentRegistry: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> LauncherResult<Value>;

    async fn project(&self, id: &str) -> LauncherResult<RegistryProject>;

    async fn project_versions(&self, id: &str) -> LauncherResult<Vec<RegistryVersion>>;

    /// `None` when the registry does not know the file.
    async fn version_by_hash(&self, sha1: &str) -> LauncherResult<Option<RegistryVersion>>;

    /// Usernames of the project's team.
    async fn members(&self, project_id: &str) -> LauncherResult<Vec<String>>;
}

/// Newest version that runs on `game_version`. Mods must also list the
/// instance's loader; quilt instances accept fabric builds.
pub fn best_version<'v>(
    versions: &'v [RegistryVersion],
    game_version: &str,
    loader: Option<&LoaderKind>,
    category: ContentCategory,
) -> Option<&'v RegistryVersion> {
    let accepts_loader = |v: &RegistryVersion| -> bool {
        if category != ContentCategory::Mods {
            return true;
        }
        let kind = match loader {
            Some(kind) => kind,
            None => return true,
        };
        v.loaders.iter().any(|l| {
            l == kind.as_str() || (*kind == LoaderKind::Quilt && l == LoaderKind::Fabric.as_str())
        })
    };

    versions
        .iter()
        .filter(|v| v.game_versions.iter().any(|g| g == game_version))
        .filter(|v| accepts_loader(v))
        .max_by(|a, b| a.date_published.cmp(&b.date_published))
}

pub struct ModrinthRegistry {
    fetcher: Arc<dyn Fetcher>,
    base: String,
}

impl ModrinthRegistry {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            base: MODRINTH_API.to_string(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> LauncherResult<String> {
        let raw = format!("{}/{}", self.base.trim_end_matches('/'), path);
        Url::parse_with_params(&raw, params)
            .map(|u| u.to_string())
            .map_err(|e| LauncherError::Other(format!("bad registry url {}: {}", raw, e)))
    }
}

#[async_trait]
impl ContentRegistry for ModrinthRegistry {
    async fn search(&self, query: &SearchQuery) -> LauncherResult<Value> {
        let mut params = vec![("query", query.query.clone()), ("offset", query.offset.to_string())];
        if let Some(facets) = &query.facets {
            params.push(("facets", facets.clone()));
        }
        if let Some(index) = &query.index {
            params.push(("index", index.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        let url = self.url("search", &params)?;
        debug!("Registry search: {}", url);
        fetch_json(&*self.fetcher, &url).await
    }

    async fn project(&self, id: &str) -> LauncherResult<RegistryProject> {
        let url = self.url(&format!("project/{}", id), &[])?;
        fetch_json(&*self.fetcher, &url).await.map_err(|e| match e {
            LauncherError::DownloadFailed { status: 404, .. } => LauncherError::NotFound {
                kind: "project",
                id: id.to_string(),
            },
            other => other,
        })
    }

    async fn project_versions(&self, id: &str) -> LauncherResult<Vec<RegistryVersion>> {
        let url = self.url(&format!("project/{}/version", id), &[])?;
        fetch_json(&*self.fetcher, &url).await
    }

    async fn version_by_hash(&self, sha1: &str) -> LauncherResult<Option<RegistryVersion>> {
        let url = self.url(
            &format!("version_file/{}", sha1),
            &[("algorithm", "sha1".to_string())],
        )?;
        match fetch_json(&*self.fetcher, &url).await {
            Ok(version) => Ok(Some(version)),
            Err(LauncherError::DownloadFailed { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn members(&self, project_id: &str) -> LauncherResult<Vec<String>> {
        let url = self.url(&format!("project/{}/members", project_id), &[])?;
        let members: Vec<TeamMember> = fetch_json(&*self.fetcher, &url).await?;
        Ok(members.into_iter().map(|m| m.user.username).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::testing::StaticFetcher;
    use serde_json::json;

    fn version(id: &str, game: &str, loaders: &[&str], published: &str) -> RegistryVersion {
        serde_json::from_value(json!({
            "id": id,
            "project_id": "p",
            "version_number": id,
            "game_versions": [game],
            "loaders": loaders,
            "date_published": published,
            "files": []
        }))
        .unwrap()
    }

    #[test]
    fn best_version_filters_by_game_and_loader() {
        let versions = vec![
            version("a", "1.20.1", &["forge"], "2023-09-01T00:00:00Z"),
            version("b", "1.20.1", &["fabric"], "2023-08-01T00:00:00Z"),
            version("c", "1.20.1", &["fabric"], "2023-07-01T00:00:00Z"),
            version("d", "1.19.4", &["fabric"], "2023-10-01T00:00:00Z"),
        ];

        let fabric = best_version(&versions, "1.20.1", Some(&LoaderKind::Fabric), ContentCategory::Mods);
        assert_eq!(fabric.map(|v| v.id.as_str()), Some("b"));

        let quilt = best_version(&versions, "1.20.1", Some(&LoaderKind::Quilt), ContentCategory::Mods);
        assert_eq!(quilt.map(|v| v.id.as_str()), Some("b"));

        let pack = best_version(
            &versions,
            "1.20.1",
            Some(&LoaderKind::Fabric),
            ContentCategory::ResourcePacks,
        );
        assert_eq!(pack.map(|v| v.id.as_str()), Some("a"));

        assert!(best_version(&versions, "1.16.5", None, ContentCategory::Mods).is_none());
    }

    #[tokio::test]
    async fn unknown_hash_is_none_not_an_error() {
        let fetcher = Arc::new(StaticFetcher::default());
        let registry = ModrinthRegistry::new(fetcher.clone());

        assert!(registry.version_by_hash("deadbeef").await.unwrap().is_none());
        assert_eq!(
            fetcher.calls(),
            vec!["https://api.modrinth.com/v2/version_file/deadbeef?algorithm=sha1".to_string()]
        );
    }

    #[tokio::test]
    async fn search_is_passed_through_unmodified() {
        let body = json!({ "hits": [{ "slug": "sodium" }], "total_hits": 1, "extra": true });
        let fetcher = Arc::new(StaticFetcher::default().with_json(
            "https://api.modrinth.com/v2/search?query=sodium&offset=0&limit=5",
            &body,
        ));
        let registry = ModrinthRegistry::new(fetcher);

        let result = registry
            .search(&SearchQuery {
                query: "sodium".into(),
                limit: Some(5),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(result, body);
    }
}
