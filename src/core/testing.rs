// Shared fixtures for unit tests.

use std::path::PathBuf;

use serde_json::json;

use crate::core::config::LauncherConfig;

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("blocklaunch-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a minimal vanilla descriptor plus client jar for `id`. The one
/// library hashes to the body `b"brigadier"`.
pub fn seed_vanilla(config: &LauncherConfig, id: &str) {
    std::fs::create_dir_all(config.version_dir(id)).unwrap();
    let descriptor = json!({
        "id": id,
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": { "id": "5", "url": "https://piston-meta.example/5.json" },
        "downloads": { "client": { "url": "https://piston-data.example/client.jar", "sha1": "x" } },
        "arguments": {
            "game": [
                "--username", "${auth_player_name}",
                "--version", "${version_name}",
                "--gameDir", "${game_directory}",
                "--assetsDir", "${assets_root}",
                "--assetIndex", "${assets_index_name}",
                "--uuid", "${auth_uuid}",
                "--accessToken", "${auth_access_token}",
                "--userType", "${user_type}",
                "--versionType", "${version_type}"
            ],
            "jvm": ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
        },
        "libraries": [
            {
                "name": "com.mojang:brigadier:1.1.8",
                "downloads": { "artifact": {
                    "path": "com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar",
                    "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar",
                    "sha1": "830383d3148f86d07d2bbfdaf59c35055fe57afd",
                    "size": 1
                } }
            }
        ]
    });
    std::fs::write(
        config.version_json_path(id),
        serde_json::to_vec(&descriptor).unwrap(),
    )
    .unwrap();
    std::fs::write(config.version_jar_path(id), b"client").unwrap();
}
