use serde::Deserialize;

use crate::core::error::LauncherResult;

/// `maven-metadata.xml`, used to list Forge/NeoForge builds.
#[derive(Debug, Deserialize)]
pub struct MavenMetadata {
    versioning: Versioning,
}

#[derive(Debug, Deserialize)]
struct Versioning {
    versions: Versions,
}

#[derive(Debug, Deserialize)]
struct Versions {
    #[serde(rename = "version", default)]
    version: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LauncherResult<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn versions(&self) -> &[String] {
        &self.versioning.versions.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_list() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.minecraftforge</groupId>
  <artifactId>forge</artifactId>
  <versioning>
    <latest>1.20.1-47.2.0</latest>
    <versions>
      <version>1.20.1-47.1.0</version>
      <version>1.20.1-47.2.0</version>
    </versions>
  </versioning>
</metadata>"#;
        let meta = MavenMetadata::parse(xml).unwrap();
        assert_eq!(meta.versions(), ["1.20.1-47.1.0", "1.20.1-47.2.0"]);
    }
}
