// In-memory registry for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::registry::{ContentRegistry, RegistryProject, RegistryVersion, SearchQuery};
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Default)]
pub struct FakeRegistry {
    projects: HashMap<String, RegistryProject>,
    versions: HashMap<String, Vec<RegistryVersion>>,
    by_hash: HashMap<String, RegistryVersion>,
    members: HashMap<String, Vec<String>>,
}

impl FakeRegistry {
    pub fn with_project(mut self, project: Value, versions: Vec<Value>, members: &[&str]) -> Self {
        let project: RegistryProject = serde_json::from_value(project).unwrap();
        let versions: Vec<RegistryVersion> = versions
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        for version in &versions {
            for file in &version.files {
                if let Some(sha1) = file.sha1() {
                    self.by_hash.insert(sha1.to_string(), version.clone());
                }
            }
        }
        self.members
            .insert(project.id.clone(), members.iter().map(|m| m.to_string()).collect());
        self.versions.insert(project.id.clone(), versions);
        self.projects.insert(project.id.clone(), project);
        self
    }
}

#[async_trait]
impl ContentRegistry for FakeRegistry {
    async fn search(&self, query: &SearchQuery) -> LauncherResult<Value> {
        let hits: Vec<Value> = self
            .projects
            .values()
            .filter(|p| p.title.to_lowercase().contains(&query.query.to_lowercase()))
            .map(|p| json!({ "project_id": p.id, "title": p.title }))
            .collect();
        Ok(json!({ "total_hits": hits.len(), "hits": hits }))
    }

    async fn project(&self, id: &str) -> LauncherResult<RegistryProject> {
        self.projects.get(id).cloned().ok_or_else(|| LauncherError::NotFound {
            kind: "project",
            id: id.to_string(),
        })
    }

    async fn project_versions(&self, id: &str) -> LauncherResult<Vec<RegistryVersion>> {
        Ok(self.versions.get(id).cloned().unwrap_or_default())
    }

    async fn version_by_hash(&self, sha1: &str) -> LauncherResult<Option<RegistryVersion>> {
        Ok(self.by_hash.get(sha1).cloned())
    }

    async fn members(&self, project_id: &str) -> LauncherResult<Vec<String>> {
        Ok(self.members.get(project_id).cloned().unwrap_or_default())
    }
}
