// ─── Resolution Request ───
// Immutable description of one resolution run: ordered root coordinates
// plus exclusion rules. Built once per plugin startup.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::{ResolverError, ResolverResult};

/// A `group:artifact` exclusion pattern. Either side may be the wildcard
/// `*`; a matching coordinate is dropped before any fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub group: String,
    pub artifact: String,
}

impl ExclusionRule {
    /// Parse `group:artifact` (exact segments or `*`).
    pub fn parse(pattern: &str) -> ResolverResult<Self> {
        let mut parts = pattern.split(':');
        let (group, artifact) = match (parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(a), None) if !g.is_empty() && !a.is_empty() => (g, a),
            _ => {
                return Err(ResolverError::MalformedCoordinate(format!(
                    "exclusion pattern '{}' (expected group:artifact)",
                    pattern
                )))
            }
        };
        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
        })
    }

    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        segment_matches(&self.group, &coordinate.group)
            && segment_matches(&self.artifact, &coordinate.artifact)
    }
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

/// Ordered root coordinates and exclusions for one run. Root strings are
/// parsed during the run so one malformed entry fails alone instead of
/// aborting the batch; exclusion patterns are validated here, up front.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    roots: Vec<String>,
    exclusions: Vec<ExclusionRule>,
}

impl ResolutionRequest {
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            exclusions: Vec::new(),
        }
    }

    /// Attach exclusion patterns. Fails fast on a malformed pattern.
    pub fn with_exclusions<I, S>(mut self, patterns: I) -> ResolverResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.exclusions.push(ExclusionRule::parse(pattern.as_ref())?);
        }
        Ok(self)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn is_excluded(&self, coordinate: &Coordinate) -> bool {
        self.exclusions.iter().any(|rule| rule.matches(coordinate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(raw: &str) -> Coordinate {
        Coordinate::parse(raw).unwrap()
    }

    #[test]
    fn exact_rule_matches_only_its_pair() {
        let rule = ExclusionRule::parse("com.example:lib").unwrap();
        assert!(rule.matches(&coordinate("com.example:lib:1.0")));
        assert!(!rule.matches(&coordinate("com.example:other:1.0")));
        assert!(!rule.matches(&coordinate("org.example:lib:1.0")));
    }

    #[test]
    fn wildcard_group_matches_any_group() {
        let rule = ExclusionRule::parse("*:lib").unwrap();
        assert!(rule.matches(&coordinate("com.a:lib:1.0")));
        assert!(rule.matches(&coordinate("org.b:lib:2.0")));
        assert!(!rule.matches(&coordinate("com.a:other:1.0")));
    }

    #[test]
    fn wildcard_artifact_matches_whole_group() {
        let rule = ExclusionRule::parse("com.example:*").unwrap();
        assert!(rule.matches(&coordinate("com.example:anything:1.0")));
        assert!(!rule.matches(&coordinate("org.example:anything:1.0")));
    }

    #[test]
    fn malformed_patterns_rejected() {
        assert!(ExclusionRule::parse("com.example").is_err());
        assert!(ExclusionRule::parse("a:b:c").is_err());
        assert!(ExclusionRule::parse(":b").is_err());
        assert!(ExclusionRule::parse("").is_err());
    }

    #[test]
    fn request_applies_all_rules() {
        let request = ResolutionRequest::new(["com.example:lib:1.0"])
            .with_exclusions(["org.dropme:*", "*:banned"])
            .unwrap();
        assert!(request.is_excluded(&coordinate("org.dropme:x:1.0")));
        assert!(request.is_excluded(&coordinate("any.group:banned:1.0")));
        assert!(!request.is_excluded(&coordinate("com.example:lib:1.0")));
    }

    #[test]
    fn request_rejects_malformed_exclusions() {
        let result = ResolutionRequest::new(["a:b:1"]).with_exclusions(["notapattern"]);
        assert!(result.is_err());
    }

    #[test]
    fn roots_keep_declaration_order() {
        let request = ResolutionRequest::new(["z:z:1", "a:a:1"]);
        assert_eq!(request.roots(), ["z:z:1", "a:a:1"]);
    }
}
