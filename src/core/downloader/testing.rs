// In-memory fetcher for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{ByteProgress, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};

/// Serves a fixed url → body table and records every request.
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn with_route(mut self, url: &str, body: &[u8]) -> Self {
        self.routes.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn with_json(self, url: &str, value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).unwrap();
        self.with_route(url, &body)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn lookup(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.lookup(url)
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> LauncherResult<()> {
        let body = self.lookup(url)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, &body)?;
        if let Some(report) = progress {
            report(body.len() as u64, Some(body.len() as u64));
        }
        Ok(())
    }
}
