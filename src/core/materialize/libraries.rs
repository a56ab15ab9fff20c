use std::collections::HashSet;
use std::path::Path;

use crate::core::downloader::DownloadTask;
use crate::core::rules::Platform;
use crate::core::version::{ResolvedArtifact, VersionDescriptor};

/// Download work derived from a descriptor's library list.
#[derive(Debug, Default)]
pub struct LibraryPlan {
    pub tasks: Vec<DownloadTask>,
    /// Libraries with no known URL that are also missing locally.
    pub unresolved: Vec<String>,
    /// Entries dropped by their platform rules.
    pub filtered: usize,
}

impl LibraryPlan {
    fn push(&mut self, seen: &mut HashSet<std::path::PathBuf>, name: &str, artifact: ResolvedArtifact) {
        if !seen.insert(artifact.path.clone()) {
            return;
        }
        match artifact.url {
            Some(url) => self
                .tasks
                .push(DownloadTask::new(url, artifact.path).with_sha1(artifact.sha1.as_deref())),
            None if artifact.path.exists() => {}
            None => self.unresolved.push(name.to_string()),
        }
    }
}

/// One task per allowed main artifact and per native classifier artifact.
/// Merged descriptors may list the same jar twice; each path is planned once.
pub fn plan_libraries(
    descriptor: &VersionDescriptor,
    libraries_dir: &Path,
    platform: &Platform,
) -> LibraryPlan {
    let mut plan = LibraryPlan::default();
    let mut seen = HashSet::new();

    for library in &descriptor.libraries {
        if !library.applies_to(platform) {
            plan.filtered += 1;
            continue;
        }
        if let Some(artifact) = library.main_artifact(libraries_dir) {
            plan.push(&mut seen, &library.name, artifact);
        }
        if let Some(native) = library.native_artifact(libraries_dir, platform) {
            plan.push(&mut seen, &library.name, native);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(libraries: serde_json::Value) -> VersionDescriptor {
        serde_json::from_value(json!({ "id": "test", "libraries": libraries })).unwrap()
    }

    const LINUX: Platform = Platform {
        os: "linux",
        arch: "x86_64",
    };

    #[test]
    fn disallowed_library_produces_no_task() {
        let d = descriptor(json!([
            {
                "name": "ca.weblite:java-objc-bridge:1.1",
                "downloads": { "artifact": {
                    "path": "ca/weblite/java-objc-bridge/1.1/java-objc-bridge-1.1.jar",
                    "url": "https://libraries.minecraft.net/ca/weblite/java-objc-bridge/1.1/java-objc-bridge-1.1.jar"
                }},
                "rules": [{ "action": "allow", "os": { "name": "osx" } }]
            },
            { "name": "com.mojang:brigadier:1.1.8" }
        ]));

        let plan = plan_libraries(&d, Path::new("/libs"), &LINUX);
        assert_eq!(plan.filtered, 1);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(
            plan.tasks[0].url,
            "https://libraries.minecraft.net/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar"
        );
    }

    #[test]
    fn native_classifier_gets_its_own_task() {
        let d = descriptor(json!([{
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4-nightly-20150209",
            "natives": { "linux": "natives-linux", "windows": "natives-windows-${arch}" },
            "downloads": { "classifiers": {
                "natives-linux": {
                    "path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4-nightly-20150209/lwjgl-platform-2.9.4-nightly-20150209-natives-linux.jar",
                    "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/lwjgl-platform/2.9.4-nightly-20150209/lwjgl-platform-2.9.4-nightly-20150209-natives-linux.jar",
                    "sha1": "931074f46c795d2f7b30ed6395df5715cfd7675b"
                }
            }}
        }]));

        let plan = plan_libraries(&d, Path::new("/libs"), &LINUX);
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.tasks[0].url.ends_with("-natives-linux.jar"));
        assert!(plan.tasks[0].hash.is_some());
    }

    #[test]
    fn duplicate_paths_are_planned_once() {
        let d = descriptor(json!([
            { "name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/" },
            { "name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/" }
        ]));
        assert_eq!(plan_libraries(&d, Path::new("/libs"), &LINUX).tasks.len(), 1);
    }

    #[test]
    fn artifact_without_url_is_unresolved_when_absent() {
        let d = descriptor(json!([{
            "name": "net.minecraftforge:forge:1.20.1-47.2.0:client",
            "downloads": { "artifact": { "path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar", "url": "" } }
        }]));
        let plan = plan_libraries(&d, Path::new("/definitely/not/here"), &LINUX);
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.unresolved, vec!["net.minecraftforge:forge:1.20.1-47.2.0:client"]);
    }
}
