mod client;
mod metadata;

pub use client::{ArtifactSource, FetchedArtifact, RepositoryClient};
pub use metadata::VersionList;

use serde::{Deserialize, Serialize};

/// Well-known repositories for the proxy plugin ecosystem.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const PAPER_MAVEN: &str = "https://repo.papermc.io/repository/maven-public";
pub const SONATYPE_SNAPSHOTS: &str = "https://s01.oss.sonatype.org/content/repositories/snapshots";

/// A remote repository to consult during resolution.
///
/// Repositories are consulted in ascending `priority` order (ties keep
/// declaration order); the first one that serves a verified artifact wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub base_url: String,
    pub priority: u32,
    pub requires_auth: bool,
    /// Bearer token sent when `requires_auth` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl RepositoryDescriptor {
    pub fn new(base_url: impl Into<String>, priority: u32) -> Self {
        Self {
            base_url: base_url.into(),
            priority,
            requires_auth: false,
            auth_token: None,
        }
    }

    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.requires_auth = true;
        self.auth_token = Some(token.into());
        self
    }
}

/// Sort a repository list into consultation order.
pub(crate) fn consultation_order(repositories: &[RepositoryDescriptor]) -> Vec<&RepositoryDescriptor> {
    let mut ordered: Vec<&RepositoryDescriptor> = repositories.iter().collect();
    ordered.sort_by_key(|r| r.priority);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultation_order_respects_priority() {
        let repos = vec![
            RepositoryDescriptor::new("https://b.example", 10),
            RepositoryDescriptor::new("https://a.example", 1),
        ];
        let ordered = consultation_order(&repos);
        assert_eq!(ordered[0].base_url, "https://a.example");
    }

    #[test]
    fn consultation_order_keeps_declaration_order_on_ties() {
        let repos = vec![
            RepositoryDescriptor::new("https://first.example", 5),
            RepositoryDescriptor::new("https://second.example", 5),
        ];
        let ordered = consultation_order(&repos);
        assert_eq!(ordered[0].base_url, "https://first.example");
        assert_eq!(ordered[1].base_url, "https://second.example");
    }

    #[test]
    fn with_auth_marks_repository() {
        let repo = RepositoryDescriptor::new("https://priv.example", 0).with_auth("token");
        assert!(repo.requires_auth);
        assert_eq!(repo.auth_token.as_deref(), Some("token"));
    }
}
