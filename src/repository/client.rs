// ─── Repository Client ───
// HTTP access to remote repositories: metadata lookup and verified
// artifact downloads with bounded retry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::metadata::VersionList;
use super::{consultation_order, RepositoryDescriptor};
use crate::checksum::{normalize_published_value, Checksum, ChecksumAlgorithm};
use crate::config::ResolverConfig;
use crate::coordinate::Coordinate;
use crate::error::{ResolverError, ResolverResult};
use crate::http::build_http_client;

/// Verified artifact bytes straight off the wire. Nothing reaches the
/// cache, or the caller, before the published checksum matched.
#[derive(Debug)]
pub struct FetchedArtifact {
    pub bytes: Vec<u8>,
    pub checksum: Checksum,
    pub source_repository: String,
}

/// Seam between the resolver engine and the network. Production code uses
/// [`RepositoryClient`]; engine tests substitute an in-memory source.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Published versions for the coordinate's `group:artifact`, from the
    /// first repository that has metadata.
    async fn fetch_metadata(&self, coordinate: &Coordinate) -> ResolverResult<VersionList>;

    /// Checksum-verified artifact bytes from the first repository that
    /// serves them intact.
    async fn fetch_artifact(&self, coordinate: &Coordinate) -> ResolverResult<FetchedArtifact>;
}

pub struct RepositoryClient {
    client: Client,
    repositories: Vec<RepositoryDescriptor>,
    config: ResolverConfig,
}

impl RepositoryClient {
    pub fn new(
        repositories: Vec<RepositoryDescriptor>,
        config: ResolverConfig,
    ) -> ResolverResult<Self> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            repositories,
            config,
        })
    }

    // ── Single GET with retry ───────────────────────────

    /// GET `url`, returning `None` on 404. Transient failures (timeout,
    /// connect, 5xx) are retried with exponential backoff up to the
    /// configured absolute bound; a 404 is never retried.
    async fn get(
        &self,
        url: &str,
        repo: &RepositoryDescriptor,
    ) -> ResolverResult<Option<Vec<u8>>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send(url, repo).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts => {
                    let delay = backoff_delay(self.config.retry_backoff, attempt);
                    debug!(
                        "Transient failure for {} (attempt {}/{}), retrying in {:?}: {}",
                        url, attempt, self.config.retry_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(
        &self,
        url: &str,
        repo: &RepositoryDescriptor,
    ) -> ResolverResult<Option<Vec<u8>>> {
        let mut request = self.client.get(url);
        if repo.requires_auth {
            if let Some(token) = &repo.auth_token {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ResolverError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }

    // ── Integrity ───────────────────────────────────────

    /// Verify downloaded bytes against the repository's published checksum
    /// file. Algorithms are probed in preference order; the first published
    /// digest decides. A repository publishing no checksum at all fails the
    /// artifact for that repository.
    async fn verify(
        &self,
        coordinate: &Coordinate,
        repo: &RepositoryDescriptor,
        artifact_url: &str,
        bytes: &[u8],
    ) -> ResolverResult<Checksum> {
        for algorithm in ChecksumAlgorithm::preference_order() {
            let checksum_url = format!("{}.{}", artifact_url, algorithm.file_suffix());
            let Some(raw) = self.get(&checksum_url, repo).await? else {
                continue;
            };

            let expected = normalize_published_value(&String::from_utf8_lossy(&raw));
            if expected.is_empty() {
                warn!("Empty {} checksum file at {}", algorithm.name(), checksum_url);
                continue;
            }

            let actual = algorithm.digest(bytes);
            if actual == expected {
                return Ok(Checksum {
                    algorithm: *algorithm,
                    value: actual,
                });
            }

            // Logged distinctly: a mismatch can mean tampering or a broken
            // mirror, not just a missing file.
            warn!(
                "{} mismatch for {} from {}: expected {}, got {}",
                algorithm.name(),
                coordinate,
                repo.base_url,
                expected,
                actual
            );
            return Err(ResolverError::ChecksumMismatch {
                coordinate: coordinate.to_string(),
                algorithm: algorithm.name(),
                expected,
                actual,
            });
        }

        Err(ResolverError::Other(format!(
            "No published checksum for {} at {}",
            coordinate, repo.base_url
        )))
    }
}

/// Exponential backoff for retry `attempt` (1-based). The exponent is
/// capped so a large configured attempt bound cannot overflow the
/// multiplication.
fn backoff_delay(base: std::time::Duration, attempt: u32) -> std::time::Duration {
    base * 2u32.saturating_pow((attempt - 1).min(16))
}

/// Rank failure causes so the terminal error names the most telling one:
/// an integrity failure outranks a transport failure outranks a plain miss.
fn severity(error: &ResolverError) -> u8 {
    match error {
        ResolverError::ChecksumMismatch { .. } => 3,
        ResolverError::Http(_) | ResolverError::DownloadFailed { .. } => 2,
        _ => 1,
    }
}

#[async_trait]
impl ArtifactSource for RepositoryClient {
    async fn fetch_metadata(&self, coordinate: &Coordinate) -> ResolverResult<VersionList> {
        for repo in consultation_order(&self.repositories) {
            let url = coordinate.metadata_url(&repo.base_url);
            match self.get(&url, repo).await {
                Ok(Some(body)) => match VersionList::parse(&String::from_utf8_lossy(&body)) {
                    Ok(list) => {
                        debug!(
                            "Metadata for {} from {}: {} versions",
                            coordinate.conflict_key(),
                            repo.base_url,
                            list.versions.len()
                        );
                        return Ok(list);
                    }
                    Err(e) => warn!("Unparseable metadata at {}: {}", url, e),
                },
                Ok(None) => debug!("No metadata at {}", url),
                Err(e) => warn!("Metadata fetch failed at {}: {}", url, e),
            }
        }
        Err(ResolverError::NotFound(format!(
            "metadata for {}",
            coordinate.conflict_key()
        )))
    }

    async fn fetch_artifact(&self, coordinate: &Coordinate) -> ResolverResult<FetchedArtifact> {
        let mut terminal: Option<ResolverError> = None;

        for repo in consultation_order(&self.repositories) {
            let url = coordinate.remote_url(&repo.base_url);

            let bytes = match self.get(&url, repo).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!("{} not present at {}", coordinate, repo.base_url);
                    continue;
                }
                Err(e) => {
                    warn!("Fetch failed for {} from {}: {}", coordinate, repo.base_url, e);
                    if terminal.as_ref().map_or(true, |t| severity(&e) > severity(t)) {
                        terminal = Some(e);
                    }
                    continue;
                }
            };

            match self.verify(coordinate, repo, &url, &bytes).await {
                Ok(checksum) => {
                    debug!(
                        "Downloaded {} from {} ({} bytes, {})",
                        coordinate,
                        repo.base_url,
                        bytes.len(),
                        checksum.algorithm.name()
                    );
                    return Ok(FetchedArtifact {
                        bytes,
                        checksum,
                        source_repository: repo.base_url.clone(),
                    });
                }
                Err(e) => {
                    if terminal.as_ref().map_or(true, |t| severity(&e) > severity(t)) {
                        terminal = Some(e);
                    }
                }
            }
        }

        Err(terminal.unwrap_or_else(|| ResolverError::NotFound(coordinate.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1000));
    }

    #[test]
    fn backoff_exponent_is_capped() {
        let base = Duration::from_millis(250);
        // A huge configured attempt bound must not overflow the multiply.
        assert_eq!(backoff_delay(base, 100), base * 2u32.pow(16));
    }

    #[test]
    fn severity_prefers_integrity_failures() {
        let mismatch = ResolverError::ChecksumMismatch {
            coordinate: "a:b:1".into(),
            algorithm: "SHA-256",
            expected: "aa".into(),
            actual: "bb".into(),
        };
        let transport = ResolverError::DownloadFailed {
            url: "https://repo.example/a.jar".into(),
            status: 500,
        };
        let missing = ResolverError::Other("no published checksum".into());

        assert!(severity(&mismatch) > severity(&transport));
        assert!(severity(&transport) > severity(&missing));
    }
}
