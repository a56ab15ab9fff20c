// ─── Java Runtimes ───
// Maps a game version to the Java major it needs and provisions a pinned
// Temurin JRE build under `java-runtimes/{build}`.

mod extract;
mod provisioner;

pub use extract::{extract_runtime_archive, locate_java_binary};
pub use provisioner::JavaProvisioner;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::rules::Platform;

/// A known-good runtime release for one Java major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeBuild {
    pub major: u32,
    /// Release tag, also the storage directory name.
    pub release: &'static str,
    /// Version string as it appears in the archive file name.
    pub file_version: &'static str,
}

const RUNTIME_BUILDS: [RuntimeBuild; 3] = [
    RuntimeBuild {
        major: 8,
        release: "jdk8u402-b06",
        file_version: "8u402b06",
    },
    RuntimeBuild {
        major: 17,
        release: "jdk-17.0.10+7",
        file_version: "17.0.10_7",
    },
    RuntimeBuild {
        major: 21,
        release: "jdk-21.0.2+13",
        file_version: "21.0.2_13",
    },
];

pub fn runtime_build(major: u32) -> Option<RuntimeBuild> {
    RUNTIME_BUILDS.iter().copied().find(|b| b.major == major)
}

impl RuntimeBuild {
    pub fn archive_extension(&self, platform: &Platform) -> &'static str {
        if platform.os == "windows" {
            "zip"
        } else {
            "tar.gz"
        }
    }

    pub fn archive_url(&self, platform: &Platform) -> LauncherResult<String> {
        let arch = match platform.arch {
            "x86_64" => "x64",
            "arm64" => "aarch64",
            other => {
                return Err(LauncherError::Unsupported(format!(
                    "no Java {} runtime published for architecture {}",
                    self.major, other
                )))
            }
        };
        let os = match platform.os {
            "windows" => "windows",
            "osx" => "mac",
            _ => "linux",
        };

        Ok(format!(
            "https://github.com/adoptium/temurin{major}-binaries/releases/download/{tag}/OpenJDK{major}U-jre_{arch}_{os}_hotspot_{file}.{ext}",
            major = self.major,
            tag = self.release.replace('+', "%2B"),
            arch = arch,
            os = os,
            file = self.file_version,
            ext = self.archive_extension(platform),
        ))
    }
}

/// ≥1.21 → 21, ≥1.17 → 17, else 8. Snapshots are placed by their year.
pub fn required_java_major(game_version: &str) -> u32 {
    let lower = game_version.to_ascii_lowercase();
    if let Some(week_pos) = lower.find('w') {
        let year_hint = &lower[..week_pos];
        if year_hint.len() == 2 {
            if let Ok(year) = year_hint.parse::<u32>() {
                return if year >= 24 {
                    21
                } else if year >= 21 {
                    17
                } else {
                    8
                };
            }
        }
    }

    let mut parts = lower
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(1);
    let minor = parts.next().unwrap_or(0);

    if major > 1 || minor >= 21 {
        21
    } else if minor >= 17 {
        17
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_major_table() {
        assert_eq!(required_java_major("1.8.9"), 8);
        assert_eq!(required_java_major("1.16.5"), 8);
        assert_eq!(required_java_major("1.17"), 17);
        assert_eq!(required_java_major("1.20.1"), 17);
        assert_eq!(required_java_major("1.21"), 21);
        assert_eq!(required_java_major("1.21.4"), 21);
        assert_eq!(required_java_major("24w14a"), 21);
        assert_eq!(required_java_major("22w45a"), 17);
    }

    #[test]
    fn temurin_archive_urls() {
        let build = runtime_build(17).unwrap();
        let linux = Platform {
            os: "linux",
            arch: "x86_64",
        };
        assert_eq!(
            build.archive_url(&linux).unwrap(),
            "https://github.com/adoptium/temurin17-binaries/releases/download/jdk-17.0.10%2B7/OpenJDK17U-jre_x64_linux_hotspot_17.0.10_7.tar.gz"
        );

        let mac = Platform {
            os: "osx",
            arch: "arm64",
        };
        assert!(runtime_build(21)
            .unwrap()
            .archive_url(&mac)
            .unwrap()
            .ends_with("OpenJDK21U-jre_aarch64_mac_hotspot_21.0.2_13.tar.gz"));

        let win32 = Platform {
            os: "windows",
            arch: "x86",
        };
        assert!(matches!(
            build.archive_url(&win32),
            Err(LauncherError::Unsupported(_))
        ));
    }

    #[test]
    fn every_table_major_has_a_build() {
        for gv in ["1.12.2", "1.18.2", "1.21.1"] {
            assert!(runtime_build(required_java_major(gv)).is_some());
        }
    }
}
