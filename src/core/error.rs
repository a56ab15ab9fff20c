use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Central error type for the launch engine and the content pipeline.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Lookup ──────────────────────────────────────────
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Version not found in manifest: {0}")]
    VersionNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Offline: {0}")]
    OfflinePrecondition(String),

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    // ── Loader ──────────────────────────────────────────
    #[error("{loader} installer exited with code {code:?}")]
    InstallerFailure { loader: String, code: Option<i32> },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Parsing ─────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Coarse classification surfaced to callers next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NetworkFailure,
    HashMismatch,
    InstallerFailure,
    Unsupported,
    OfflinePrecondition,
    Internal,
}

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::NotFound { .. }
            | LauncherError::VersionNotFound(_)
            | LauncherError::InstanceNotFound(_) => ErrorKind::NotFound,
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::Timeout(_) => ErrorKind::NetworkFailure,
            LauncherError::OfflinePrecondition(_) => ErrorKind::OfflinePrecondition,
            LauncherError::HashMismatch { .. } => ErrorKind::HashMismatch,
            LauncherError::InstallerFailure { .. } => ErrorKind::InstallerFailure,
            LauncherError::Unsupported(_) => ErrorKind::Unsupported,
            _ => ErrorKind::Internal,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Hosts receive the error as its display string.
impl Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Structured `{ success, error }` result handed to hosts instead of a raw error.
#[derive(Debug, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
}

impl<T> OperationResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            success: true,
            error: None,
            kind: None,
            value: Some(value),
        }
    }

    pub fn failed(err: &LauncherError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
            value: None,
        }
    }
}

impl<T> From<LauncherResult<T>> for OperationResult<T> {
    fn from(result: LauncherResult<T>) -> Self {
        match result {
            Ok(value) => OperationResult::ok(value),
            Err(err) => OperationResult::failed(&err),
        }
    }
}
