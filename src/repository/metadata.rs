// ─── Repository Metadata ───
// Minimal maven-metadata.xml model — only the versioning block matters
// for pinning floating versions.

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::coordinate::compare_versions;
use crate::error::ResolverResult;

#[derive(Debug, Deserialize, Default)]
struct MetadataDocument {
    #[serde(default)]
    versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize, Default)]
struct Versioning {
    #[serde(default)]
    latest: Option<String>,
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    versions: Option<Versions>,
}

#[derive(Debug, Deserialize, Default)]
struct Versions {
    #[serde(default, rename = "version")]
    items: Vec<String>,
}

/// Published versions of a `group:artifact`, newest knowledge first-hand
/// from the repository's metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionList {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

impl VersionList {
    /// Parse a `maven-metadata.xml` document.
    pub fn parse(xml: &str) -> ResolverResult<Self> {
        let doc: MetadataDocument = from_str(xml)?;
        let versioning = doc.versioning.unwrap_or_default();
        Ok(Self {
            latest: versioning.latest,
            release: versioning.release,
            versions: versioning.versions.unwrap_or_default().items,
        })
    }

    /// Pin a floating version marker to a concrete version.
    ///
    /// `latest` prefers the metadata's own `<latest>` tag, `release` the
    /// `<release>` tag; either falls back to the highest listed version.
    pub fn pin(&self, marker: &str) -> Option<String> {
        let tagged = match marker {
            "latest" => self.latest.clone(),
            "release" => self.release.clone(),
            _ => return Some(marker.to_string()),
        };
        tagged.or_else(|| self.highest())
    }

    /// Highest listed version by segment ordering.
    pub fn highest(&self) -> Option<String> {
        self.versions
            .iter()
            .max_by(|a, b| compare_versions(a, b))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <metadata>
        <groupId>com.example</groupId>
        <artifactId>lib</artifactId>
        <versioning>
            <latest>1.3.0</latest>
            <release>1.2.0</release>
            <versions>
                <version>1.1.0</version>
                <version>1.2.0</version>
                <version>1.3.0</version>
            </versions>
            <lastUpdated>20250101000000</lastUpdated>
        </versioning>
    </metadata>
    "#;

    #[test]
    fn parse_versioning_block() {
        let list = VersionList::parse(SAMPLE).unwrap();
        assert_eq!(list.latest.as_deref(), Some("1.3.0"));
        assert_eq!(list.release.as_deref(), Some("1.2.0"));
        assert_eq!(list.versions.len(), 3);
    }

    #[test]
    fn pin_prefers_tags() {
        let list = VersionList::parse(SAMPLE).unwrap();
        assert_eq!(list.pin("latest").as_deref(), Some("1.3.0"));
        assert_eq!(list.pin("release").as_deref(), Some("1.2.0"));
    }

    #[test]
    fn pin_concrete_version_passes_through() {
        let list = VersionList::default();
        assert_eq!(list.pin("2.0.1").as_deref(), Some("2.0.1"));
    }

    #[test]
    fn pin_falls_back_to_highest_listed() {
        let xml = r#"
        <metadata>
            <versioning>
                <versions>
                    <version>1.9.0</version>
                    <version>1.10.0</version>
                </versions>
            </versioning>
        </metadata>
        "#;
        let list = VersionList::parse(xml).unwrap();
        assert_eq!(list.pin("latest").as_deref(), Some("1.10.0"));
    }

    #[test]
    fn parse_empty_metadata() {
        let list = VersionList::parse("<metadata/>").unwrap();
        assert!(list.versions.is_empty());
        assert_eq!(list.highest(), None);
    }
}
