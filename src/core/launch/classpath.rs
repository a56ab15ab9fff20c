use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::rules::Platform;
use crate::core::version::VersionDescriptor;

pub fn classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// Allowed library jars present on disk, first occurrence wins, then the
/// client jar last. Natives-only entries never go on the classpath.
pub fn build_classpath(
    config: &LauncherConfig,
    descriptor: &VersionDescriptor,
    platform: &Platform,
) -> LauncherResult<Vec<PathBuf>> {
    let libs = config.libraries_dir();
    let mut entries: Vec<PathBuf> = Vec::new();

    for library in descriptor.libraries.iter().filter(|l| l.applies_to(platform)) {
        if library.is_native_coordinate() {
            continue;
        }
        let artifact = match library.main_artifact(&libs) {
            Some(a) => a,
            None => continue,
        };
        if !artifact.path.exists() {
            warn!("Library {} missing at {:?}, leaving it off the classpath", library.name, artifact.path);
            continue;
        }
        if !entries.contains(&artifact.path) {
            entries.push(artifact.path);
        }
    }

    entries.push(client_jar(config, descriptor)?);
    debug!("Classpath has {} entries", entries.len());
    Ok(entries)
}

/// The jar named by `jar` (the vanilla base for merged loader descriptors),
/// else the descriptor's own jar.
fn client_jar(config: &LauncherConfig, descriptor: &VersionDescriptor) -> LauncherResult<PathBuf> {
    let candidates = [
        config.version_jar_path(descriptor.game_jar_id()),
        config.version_jar_path(&descriptor.id),
    ];
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| LauncherError::NotFound {
            kind: "client jar",
            id: descriptor.game_jar_id().to_string(),
        })
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| display_path(p))
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

/// Java rejects `\\?\` extended-length paths on the classpath.
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
