// ─── Local Metadata Inference ───
// Reads what a content file says about itself: loader manifests inside
// mod jars, pack.mcmeta inside packs, and as a last resort the file name.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// What could be learned about a file without asking the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMetadata {
    pub id: String,
    pub name: String,
    pub authors: Vec<String>,
    pub version: String,
    pub icon: Option<String>,
}

type Parser = fn(&str, &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata>;

/// Entry name and parser, tried in order against the archive.
const ARCHIVE_PARSERS: [(&str, Parser); 6] = [
    ("fabric.mod.json", parse_fabric),
    ("quilt.mod.json", parse_quilt),
    ("META-INF/mods.toml", parse_mods_toml),
    ("META-INF/neoforge.mods.toml", parse_mods_toml),
    ("mcmod.info", parse_mcmod_info),
    ("pack.mcmeta", parse_pack_mcmeta),
];

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Authors given as plain strings or as `{ "name": .. }` objects.
fn people(value: Option<&Value>) -> Vec<String> {
    let list = match value.and_then(Value::as_array) {
        Some(list) => list,
        None => return Vec::new(),
    };
    list.iter()
        .filter_map(|p| match p {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => text(p.get("name")),
            _ => None,
        })
        .collect()
}

fn parse_fabric(raw: &str, _: &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata> {
    let json: Value = serde_json::from_str(raw).ok()?;
    let id = text(json.get("id"))?;
    Some(LocalMetadata {
        name: text(json.get("name")).unwrap_or_else(|| id.clone()),
        authors: people(json.get("authors")),
        version: text(json.get("version")).unwrap_or_else(|| "unknown".into()),
        icon: text(json.get("icon")),
        id,
    })
}

fn parse_quilt(raw: &str, _: &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata> {
    let json: Value = serde_json::from_str(raw).ok()?;
    let loader = json.get("quilt_loader")?;
    let id = text(loader.get("id"))?;
    let meta = loader.get("metadata");
    let authors = meta
        .and_then(|m| m.get("contributors"))
        .and_then(Value::as_object)
        .map(|c| c.keys().cloned().collect())
        .unwrap_or_default();
    Some(LocalMetadata {
        name: text(meta.and_then(|m| m.get("name"))).unwrap_or_else(|| id.clone()),
        authors,
        version: text(loader.get("version")).unwrap_or_else(|| "unknown".into()),
        icon: text(meta.and_then(|m| m.get("icon"))),
        id,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModsToml {
    #[serde(default)]
    logo_file: Option<String>,
    #[serde(default)]
    mods: Vec<ModsTomlEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModsTomlEntry {
    mod_id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    authors: Option<toml::Value>,
    #[serde(default)]
    logo_file: Option<String>,
}

fn manifest_attribute(manifest: &str, key: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim() == key {
            Some(value.trim().to_string()).filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

/// Forge and NeoForge. `${file.jarVersion}` is read from the jar manifest.
fn parse_mods_toml(raw: &str, read_entry: &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata> {
    let parsed: ModsToml = toml::from_str(raw).ok()?;
    let entry = parsed.mods.into_iter().next()?;

    let mut version = entry.version.unwrap_or_else(|| "unknown".into());
    if version.contains("${file.jarVersion}") {
        version = read_entry("META-INF/MANIFEST.MF")
            .and_then(|mf| manifest_attribute(&mf, "Implementation-Version"))
            .unwrap_or_else(|| "unknown".into());
    }
    let authors = match entry.authors {
        Some(toml::Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(toml::Value::Array(list)) => list
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    Some(LocalMetadata {
        name: entry.display_name.unwrap_or_else(|| entry.mod_id.clone()),
        authors,
        version,
        icon: entry.logo_file.or(parsed.logo_file),
        id: entry.mod_id,
    })
}

/// Legacy Forge: a bare array or `{ "modList": [...] }`.
fn parse_mcmod_info(raw: &str, _: &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata> {
    let json: Value = serde_json::from_str(raw).ok()?;
    let first = match &json {
        Value::Array(list) => list.first()?,
        Value::Object(_) => json.get("modList")?.as_array()?.first()?,
        _ => return None,
    };
    let id = text(first.get("modid"))?;
    let mut authors = people(first.get("authorList"));
    if authors.is_empty() {
        authors = people(first.get("authors"));
    }
    Some(LocalMetadata {
        name: text(first.get("name")).unwrap_or_else(|| id.clone()),
        authors,
        version: text(first.get("version")).unwrap_or_else(|| "unknown".into()),
        icon: text(first.get("logoFile")),
        id,
    })
}

/// Packs carry no id or name, only a format number and description.
fn parse_pack_mcmeta(raw: &str, _: &mut dyn FnMut(&str) -> Option<String>) -> Option<LocalMetadata> {
    let json: Value = serde_json::from_str(raw).ok()?;
    let pack = json.get("pack")?;
    let format = pack.get("pack_format").and_then(Value::as_u64)?;
    Some(LocalMetadata {
        id: String::new(),
        name: String::new(),
        authors: Vec::new(),
        version: format!("format {}", format),
        icon: Some("pack.png".into()),
    })
}

fn filename_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)[-_ ]v?(\d+(?:\.\d+)+[\w.+-]*)$").ok())
        .as_ref()
}

/// `sodium-fabric-0.5.3.jar` → name `sodium-fabric`, version `0.5.3`.
pub fn filename_fallback(file_name: &str) -> LocalMetadata {
    let lower = file_name.to_ascii_lowercase();
    let stem = [".jar", ".zip", ".disabled"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &file_name[..file_name.len() - ext.len()])
        .unwrap_or(file_name);

    let (name, version) = match filename_pattern().and_then(|re| re.captures(stem)) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (stem.to_string(), "unknown".to_string()),
    };
    LocalMetadata {
        id: name.to_ascii_lowercase().replace(' ', "-"),
        name,
        authors: Vec::new(),
        version,
        icon: None,
    }
}

fn read_zip_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut raw = String::new();
    entry.read_to_string(&mut raw).ok()?;
    Some(raw)
}

fn from_archive(path: &Path) -> Option<LocalMetadata> {
    let file = File::open(path).ok()?;
    let mut archive = zip::ZipArchive::new(file).ok()?;
    for (entry_name, parse) in ARCHIVE_PARSERS {
        let raw = match read_zip_entry(&mut archive, entry_name) {
            Some(raw) => raw,
            None => continue,
        };
        let mut read_other = |name: &str| read_zip_entry(&mut archive, name);
        if let Some(meta) = parse(&raw, &mut read_other) {
            debug!("{:?} described by {}", path, entry_name);
            return Some(meta);
        }
    }
    None
}

fn from_directory(path: &Path) -> Option<LocalMetadata> {
    let raw = std::fs::read_to_string(path.join("pack.mcmeta")).ok()?;
    parse_pack_mcmeta(&raw, &mut |_| None)
}

/// Embedded manifests first, then the file name. Blocking.
pub fn infer_local_metadata(path: &Path) -> LocalMetadata {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let fallback = filename_fallback(&file_name);

    let found = if path.is_dir() {
        from_directory(path)
    } else {
        from_archive(path)
    };

    match found {
        // Packs only know their format; identity comes from the file name.
        Some(meta) if meta.id.is_empty() => LocalMetadata {
            id: fallback.id,
            name: fallback.name,
            ..meta
        },
        Some(meta) => meta,
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::scratch_dir;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn jar(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn fabric_manifest_wins() {
        let dir = scratch_dir("meta-fabric");
        let path = dir.join("sodium.jar");
        jar(
            &path,
            &[(
                "fabric.mod.json",
                r#"{"id":"sodium","name":"Sodium","version":"0.5.3","authors":["jellysquid3",{"name":"IMS"}],"icon":"assets/sodium/icon.png"}"#,
            )],
        );

        let meta = infer_local_metadata(&path);
        assert_eq!(meta.id, "sodium");
        assert_eq!(meta.name, "Sodium");
        assert_eq!(meta.version, "0.5.3");
        assert_eq!(meta.authors, vec!["jellysquid3".to_string(), "IMS".to_string()]);
        assert_eq!(meta.icon.as_deref(), Some("assets/sodium/icon.png"));
    }

    #[test]
    fn mods_toml_reads_jar_version_from_manifest() {
        let dir = scratch_dir("meta-forge");
        let path = dir.join("jei.jar");
        jar(
            &path,
            &[
                (
                    "META-INF/mods.toml",
                    "modLoader=\"javafml\"\n[[mods]]\nmodId=\"jei\"\nversion=\"${file.jarVersion}\"\ndisplayName=\"Just Enough Items\"\nauthors=\"mezz, others\"\n",
                ),
                ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\nImplementation-Version: 15.2.0.27\n"),
            ],
        );

        let meta = infer_local_metadata(&path);
        assert_eq!(meta.id, "jei");
        assert_eq!(meta.name, "Just Enough Items");
        assert_eq!(meta.version, "15.2.0.27");
        assert_eq!(meta.authors, vec!["mezz".to_string(), "others".to_string()]);
    }

    #[test]
    fn legacy_mcmod_info_mod_list() {
        let dir = scratch_dir("meta-mcmod");
        let path = dir.join("old.jar");
        jar(
            &path,
            &[(
                "mcmod.info",
                r#"{"modListVersion":2,"modList":[{"modid":"oldmod","name":"Old Mod","version":"1.2","authorList":["someone"]}]}"#,
            )],
        );

        let meta = infer_local_metadata(&path);
        assert_eq!(meta.id, "oldmod");
        assert_eq!(meta.authors, vec!["someone".to_string()]);
    }

    #[test]
    fn pack_directory_takes_identity_from_name() {
        let dir = scratch_dir("meta-pack");
        let pack = dir.join("Faithful 1.20");
        std::fs::create_dir_all(&pack).unwrap();
        std::fs::write(
            pack.join("pack.mcmeta"),
            r#"{"pack":{"pack_format":15,"description":"x"}}"#,
        )
        .unwrap();

        let meta = infer_local_metadata(&pack);
        assert_eq!(meta.name, "Faithful");
        assert_eq!(meta.version, "format 15");
    }

    #[test]
    fn unreadable_file_falls_back_to_filename() {
        let dir = scratch_dir("meta-fallback");
        let path = dir.join("iris-mc1.20.1-1.6.4.jar");
        std::fs::write(&path, b"not a zip").unwrap();

        let meta = infer_local_metadata(&path);
        assert_eq!(meta.name, "iris-mc1.20.1");
        assert_eq!(meta.version, "1.6.4");
        assert_eq!(filename_fallback("Mystery.jar").version, "unknown");
    }
}
