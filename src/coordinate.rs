// ─── Coordinate Model ───
// Parsing, ordering and path mapping for dependency coordinates.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, ResolverResult};

/// Default packaging when a coordinate carries no `@extension` suffix.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Floating version markers resolved against repository metadata.
const FLOATING_VERSIONS: [&str; 2] = ["latest", "release"];

/// A fully parsed dependency coordinate.
///
/// Supported formats:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///   `group:artifact:version:classifier@extension`
///   `group:artifact:version@extension`
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension / packaging type. Defaults to `"jar"`.
    pub extension: String,
}

// Equality and hashing ignore the extension: a jar and its sources
// archive belong to the same conflict group.
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.artifact == other.artifact
            && self.version == other.version
            && self.classifier == other.classifier
    }
}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.artifact.hash(state);
        self.version.hash(state);
        self.classifier.hash(state);
    }
}

impl Coordinate {
    /// Parse a coordinate string.
    ///
    /// # Examples
    /// ```
    /// use runtime_resolver::Coordinate;
    /// let c = Coordinate::parse("com.google.code.gson:gson:2.13.1").unwrap();
    /// assert_eq!(c.group, "com.google.code.gson");
    /// ```
    pub fn parse(raw: &str) -> ResolverResult<Self> {
        // Split off @extension first
        let (coord_part, extension) = match raw.rfind('@') {
            Some(idx) => (&raw[..idx], &raw[idx + 1..]),
            None => (raw, DEFAULT_EXTENSION),
        };

        if extension.is_empty() {
            return Err(ResolverError::MalformedCoordinate(raw.to_string()));
        }

        let parts: Vec<&str> = coord_part.split(':').collect();
        let (group, artifact, version, classifier) = match parts.as_slice() {
            [g, a, v] => (*g, *a, *v, None),
            [g, a, v, c] => (*g, *a, *v, Some(*c)),
            _ => return Err(ResolverError::MalformedCoordinate(raw.to_string())),
        };

        if group.is_empty()
            || artifact.is_empty()
            || version.is_empty()
            || classifier.is_some_and(str::is_empty)
        {
            return Err(ResolverError::MalformedCoordinate(raw.to_string()));
        }

        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier: classifier.map(str::to_string),
            extension: extension.to_string(),
        })
    }

    /// The `group:artifact` pair used for exclusion matching and
    /// conflict grouping.
    pub fn conflict_key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// Whether the version is a floating marker (`latest`/`release`)
    /// that must be pinned against repository metadata before fetch.
    pub fn is_floating(&self) -> bool {
        FLOATING_VERSIONS.contains(&self.version.as_str())
    }

    /// Return a copy pinned to a concrete version.
    pub fn with_version(&self, version: &str) -> Self {
        let mut pinned = self.clone();
        pinned.version = version.to_string();
        pinned
    }

    /// Group portion with dots replaced by slashes (`com/google/gson`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// Remote file name: `artifact-version[-classifier].extension`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Full artifact URL under a repository base, standard Maven layout:
    /// `<base>/<group-with-slashes>/<artifact>/<version>/<file_name>`.
    pub fn remote_url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    /// Metadata URL for this coordinate's `group:artifact`.
    pub fn metadata_url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/maven-metadata.xml",
            base,
            self.group_path(),
            self.artifact
        )
    }

    /// Path relative to the cache root. This layout is stable across
    /// resolver versions so existing caches remain valid:
    /// `<group>/<artifact>/<version>/<classifier-or-default>.<extension>`.
    pub fn cache_path(&self) -> PathBuf {
        let stem = self.classifier.as_deref().unwrap_or("default");
        PathBuf::from(&self.group)
            .join(&self.artifact)
            .join(&self.version)
            .join(format!("{}.{}", stem, self.extension))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != DEFAULT_EXTENSION {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

/// Compare two version strings segment by segment.
///
/// Segments are split on `.`; numeric segments compare numerically,
/// non-numeric segments lexicographically. The shorter sequence is
/// padded with zero, so `2.0` and `2.0.0` compare equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();
    let max_len = a_parts.len().max(b_parts.len());

    for idx in 0..max_len {
        let a_seg = a_parts.get(idx).copied().unwrap_or("0");
        let b_seg = b_parts.get(idx).copied().unwrap_or("0");

        let ord = match (a_seg.parse::<u64>(), b_seg.parse::<u64>()) {
            (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
            _ => a_seg.cmp(b_seg),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}
