use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::core::error::{LauncherError, LauncherResult};

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Drops the archive's top-level directory and any non-normal component.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for component in path.components().skip(1) {
        if let Component::Normal(part) = component {
            rel.push(part);
        }
    }
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(rel)
    }
}

fn reset_dir(dir: &Path) -> LauncherResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| LauncherError::io(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| LauncherError::io(dir, e))
}

fn extract_zip(archive_path: &Path, runtime_root: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let rel = match entry.enclosed_name().as_deref().and_then(strip_top_level) {
            Some(rel) => rel,
            None => continue,
        };
        let out_path = runtime_root.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
    }
    Ok(())
}

fn extract_tar_gz(archive_path: &Path, runtime_root: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| LauncherError::io(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| LauncherError::io(archive_path, e))?;
        let raw = entry
            .path()
            .map_err(|e| LauncherError::io(archive_path, e))?
            .into_owned();
        let rel = match strip_top_level(&raw) {
            Some(rel) => rel,
            None => continue,
        };
        let out_path = runtime_root.join(rel);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        entry
            .unpack(&out_path)
            .map_err(|e| LauncherError::io(&out_path, e))?;
    }
    Ok(())
}

/// Unpack a `.zip` or `.tar.gz` runtime archive into `runtime_root`, replacing
/// whatever was there. Blocking.
pub fn extract_runtime_archive(archive_path: &Path, runtime_root: &Path) -> LauncherResult<()> {
    reset_dir(runtime_root)?;
    let name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".zip") {
        extract_zip(archive_path, runtime_root)
    } else {
        extract_tar_gz(archive_path, runtime_root)
    }
}

/// `bin/java`, the macOS bundle layout, or the first match found by walking the tree.
pub fn locate_java_binary(runtime_root: &Path) -> Option<PathBuf> {
    let primary = runtime_root.join("bin").join(java_exe());
    if primary.is_file() {
        return Some(primary);
    }
    let mac_layout = runtime_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(java_exe());
    if mac_layout.is_file() {
        return Some(mac_layout);
    }
    find_java_binary_recursive(runtime_root)
}

fn find_java_binary_recursive(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if file_type.is_file() {
            if path.file_name().and_then(|n| n.to_str()) == Some(java_exe()) {
                return Some(path);
            }
        } else if file_type.is_dir() {
            if let Some(found) = find_java_binary_recursive(&path) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(unix)]
pub(super) fn mark_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| LauncherError::io(path, e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| LauncherError::io(path, e))
}

#[cfg(not(unix))]
pub(super) fn mark_executable(_path: &Path) -> LauncherResult<()> {
    Ok(())
}
