use std::fmt;
use std::path::PathBuf;

use crate::core::error::{LauncherError, LauncherResult};

/// `group:artifact:version[:classifier][@extension]`, the naming used by
/// library entries in version descriptors and loader profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenCoordinate {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let invalid = || LauncherError::InvalidMavenCoordinate(raw.to_string());

        let (body, extension) = match raw.split_once('@') {
            Some((body, ext)) if !ext.is_empty() => (body, ext),
            Some(_) => return Err(invalid()),
            None => (raw, "jar"),
        };

        let mut parts = body.split(':');
        let group = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let artifact = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let version = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let classifier = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }

    pub fn with_classifier(&self, classifier: &str) -> Self {
        Self {
            classifier: Some(classifier.to_string()),
            ..self.clone()
        }
    }

    /// `artifact-version[-classifier].extension`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Repository-relative path using `/` separators.
    pub fn repo_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    /// Path under the local libraries root.
    pub fn local_path(&self) -> PathBuf {
        self.repo_path().split('/').collect()
    }

    pub fn url_in(&self, repository: &str) -> String {
        format!("{}/{}", repository.trim_end_matches('/'), self.repo_path())
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_classified_coordinates() {
        let plain = MavenCoordinate::parse("net.fabricmc:fabric-loader:0.15.0").unwrap();
        assert_eq!(plain.group, "net.fabricmc");
        assert_eq!(plain.classifier, None);
        assert_eq!(plain.extension, "jar");

        let native = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.1:natives-linux").unwrap();
        assert_eq!(native.classifier.as_deref(), Some("natives-linux"));
        assert_eq!(native.to_string(), "org.lwjgl:lwjgl:3.3.1:natives-linux");
    }

    #[test]
    fn extension_suffix_is_honoured() {
        let c = MavenCoordinate::parse("de.oceanlabs.mcp:mcp_config:1.20.1@zip").unwrap();
        assert_eq!(c.file_name(), "mcp_config-1.20.1.zip");
    }

    #[test]
    fn rejects_short_or_long_coordinates() {
        assert!(MavenCoordinate::parse("only:two").is_err());
        assert!(MavenCoordinate::parse("a:b:c:d:e").is_err());
        assert!(MavenCoordinate::parse("a:b:c@").is_err());
    }

    #[test]
    fn builds_repository_url_and_local_path() {
        let c = MavenCoordinate::parse("net.fabricmc:fabric-loader:0.15.0").unwrap();
        assert_eq!(
            c.url_in("https://maven.fabricmc.net/"),
            "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar"
        );
        assert_eq!(
            c.local_path(),
            PathBuf::from("net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar")
        );
    }
}
