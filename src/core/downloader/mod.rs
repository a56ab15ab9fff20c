mod client;
mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{fetch_json, ByteProgress, Fetcher, HttpFetcher};
pub use task::{materialize, materialize_all, DownloadTask, MaterializeOutcome};
