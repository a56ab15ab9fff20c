// ─── Download Tasks ───
// Idempotent "make sure this file exists" units. Present files are trusted
// as-is; hashes are only checked right after a fresh download.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::client::Fetcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::hash::{self, ExpectedHash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub hash: Option<ExpectedHash>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            hash: None,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<&str>) -> Self {
        self.hash = sha1
            .filter(|s| !s.is_empty())
            .map(|s| ExpectedHash::Sha1(s.to_string()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    AlreadyPresent,
    Downloaded,
}

/// Fetch `task.dest` unless it already exists.
pub async fn materialize(
    fetcher: &dyn Fetcher,
    task: &DownloadTask,
) -> LauncherResult<MaterializeOutcome> {
    if tokio::fs::try_exists(&task.dest).await.unwrap_or(false) {
        return Ok(MaterializeOutcome::AlreadyPresent);
    }

    fetcher.download(&task.url, &task.dest, None).await?;

    if let Some(expected) = &task.hash {
        hash::verify_file(&task.dest, expected).await?;
    }

    Ok(MaterializeOutcome::Downloaded)
}

/// Run tasks through a bounded pool. `on_done` sees the running completion count.
/// Returns the tasks that failed.
pub async fn materialize_all<F>(
    fetcher: &dyn Fetcher,
    tasks: Vec<DownloadTask>,
    concurrency: usize,
    on_done: F,
) -> Vec<(DownloadTask, LauncherError)>
where
    F: Fn(usize, usize) + Send + Sync,
{
    let total = tasks.len();
    let completed = AtomicUsize::new(0);
    info!(
        "Materializing {} artifacts, concurrency={}",
        total,
        concurrency.max(1)
    );

    let results: Vec<_> = stream::iter(tasks)
        .map(|task| {
            let completed = &completed;
            let on_done = &on_done;
            async move {
                let result = materialize(fetcher, &task).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_done(done, total);
                (task, result)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut failures = Vec::new();
    for (task, result) in results {
        match result {
            Ok(MaterializeOutcome::Downloaded) => debug!("Fetched {:?}", task.dest),
            Ok(MaterializeOutcome::AlreadyPresent) => {}
            Err(e) => {
                warn!("Failed to materialize {}: {}", task.url, e);
                failures.push((task, e));
            }
        }
    }
    failures
}
