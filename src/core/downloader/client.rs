use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Called with `(bytes_so_far, total_if_known)` while a body streams to disk.
pub type ByteProgress<'a> = dyn Fn(u64, Option<u64>) + Send + Sync + 'a;

/// Remote byte source. The engine only talks to the network through this.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>>;

    /// Stream `url` into `dest`, creating parent directories.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> LauncherResult<()>;
}

pub async fn fetch_json<T: DeserializeOwned>(fetcher: &dyn Fetcher, url: &str) -> LauncherResult<T> {
    let bytes = fetcher.fetch_bytes(url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> LauncherResult<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.get(url).await?;
        let total = response.content_length();
        let part = partial_path(dest);

        // Write inside a block so the handle is closed before the rename.
        {
            let mut file = tokio::fs::File::create(&part)
                .await
                .map_err(|e| LauncherError::io(&part, e))?;
            let mut stream = response.bytes_stream();
            let mut written: u64 = 0;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(&part, e))?;
                written += chunk.len() as u64;
                if let Some(report) = progress {
                    report(written, total);
                }
            }

            file.flush()
                .await
                .map_err(|e| LauncherError::io(&part, e))?;
        }

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }
}
