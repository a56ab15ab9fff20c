// Loader build listing for a given game version.

use serde::Deserialize;

use super::{LoaderKind, ProfileStrategy};
use crate::core::downloader::{fetch_json, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenMetadata, FORGE_MAVEN, NEOFORGE_MAVEN};

#[derive(Deserialize)]
struct MetaLoaderEntry {
    loader: MetaLoaderVersion,
}

#[derive(Deserialize)]
struct MetaLoaderVersion {
    version: String,
}

fn version_sort_key(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

async fn maven_versions(fetcher: &dyn Fetcher, url: &str) -> LauncherResult<Vec<String>> {
    let bytes = fetcher.fetch_bytes(url).await?;
    let xml = String::from_utf8_lossy(&bytes);
    Ok(MavenMetadata::parse(&xml)?.versions().to_vec())
}

/// NeoForge numbers builds after the game version minus the leading `1.`.
fn neoforge_prefix(game_version: &str) -> String {
    let trimmed = game_version.trim_start_matches("1.");
    let mut parts = trimmed.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().unwrap_or("0");
    format!("{}.{}.", major, minor)
}

/// Newest first.
pub async fn list_loader_versions(
    fetcher: &dyn Fetcher,
    kind: &LoaderKind,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    let mut versions = match kind {
        LoaderKind::Fabric | LoaderKind::Quilt | LoaderKind::LegacyFabric => {
            let strategy = match kind {
                LoaderKind::Fabric => &ProfileStrategy::FABRIC,
                LoaderKind::Quilt => &ProfileStrategy::QUILT,
                _ => &ProfileStrategy::LEGACY_FABRIC,
            };
            let url = format!("{}/versions/loader/{}", strategy.meta_base(), game_version);
            let entries: Vec<MetaLoaderEntry> = fetch_json(fetcher, &url).await?;
            entries.into_iter().map(|e| e.loader.version).collect()
        }
        LoaderKind::Forge => {
            let url = format!("{}/net/minecraftforge/forge/maven-metadata.xml", FORGE_MAVEN);
            let prefix = format!("{}-", game_version);
            maven_versions(fetcher, &url)
                .await?
                .into_iter()
                .filter_map(|v| v.strip_prefix(&prefix).map(str::to_owned))
                .collect()
        }
        LoaderKind::NeoForge => {
            let url = format!("{}/net/neoforged/neoforge/maven-metadata.xml", NEOFORGE_MAVEN);
            let prefix = neoforge_prefix(game_version);
            let mut found: Vec<String> = maven_versions(fetcher, &url)
                .await?
                .into_iter()
                .filter(|v| v.starts_with(&prefix))
                .collect();

            if game_version == "1.20.1" {
                let legacy = format!("{}/net/neoforged/forge/maven-metadata.xml", NEOFORGE_MAVEN);
                let legacy_prefix = format!("{}-", game_version);
                found.extend(
                    maven_versions(fetcher, &legacy)
                        .await?
                        .into_iter()
                        .filter_map(|v| v.strip_prefix(&legacy_prefix).map(str::to_owned)),
                );
            }
            found
        }
        LoaderKind::Unsupported(name) => {
            return Err(LauncherError::Unsupported(format!("loader type {}", name)))
        }
    };

    versions.sort_by(|a, b| {
        version_sort_key(b)
            .cmp(&version_sort_key(a))
            .then_with(|| b.cmp(a))
    });
    versions.dedup();
    Ok(versions)
}
