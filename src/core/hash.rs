// ─── Hash Verifier ───
// SHA-1 / SHA-512 digests for downloaded artifacts.

use std::path::Path;

use sha1::{Digest, Sha1};
use sha2::Sha512;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHash {
    Sha1(String),
    Sha512(String),
}

impl ExpectedHash {
    pub fn algorithm(&self) -> &'static str {
        match self {
            ExpectedHash::Sha1(_) => "SHA-1",
            ExpectedHash::Sha512(_) => "SHA-512",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ExpectedHash::Sha1(v) | ExpectedHash::Sha512(v) => v,
        }
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn sha512_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

async fn read(path: &Path) -> LauncherResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    Ok(sha1_hex(&read(path).await?))
}

pub async fn sha512_file(path: &Path) -> LauncherResult<String> {
    Ok(sha512_hex(&read(path).await?))
}

/// Fails with `HashMismatch` when the file does not match. The file is left in place.
pub async fn verify_file(path: &Path, expected: &ExpectedHash) -> LauncherResult<()> {
    let bytes = read(path).await?;
    let actual = match expected {
        ExpectedHash::Sha1(_) => sha1_hex(&bytes),
        ExpectedHash::Sha512(_) => sha512_hex(&bytes),
    };

    if actual.eq_ignore_ascii_case(expected.value()) {
        Ok(())
    } else {
        Err(LauncherError::HashMismatch {
            path: path.to_path_buf(),
            algorithm: expected.algorithm(),
            expected: expected.value().to_string(),
            actual,
        })
    }
}
