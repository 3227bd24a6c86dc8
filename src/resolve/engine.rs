// ─── Resolver Engine ───
// Drives one resolution run through its phases: parse and pin roots,
// apply exclusions, collapse conflicts, then fetch winners cache-first
// with a bounded worker pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cancel::CancelToken;
use super::report::{
    ResolutionReport, ResolvedArtifact, RunState, UnresolvedArtifact, CACHE_SOURCE,
};
use super::request::ResolutionRequest;
use crate::cache::{ArtifactCache, CacheEntry};
use crate::config::{ConflictPolicy, ResolverConfig};
use crate::coordinate::{compare_versions, Coordinate};
use crate::error::{ResolverError, ResolverResult};
use crate::repository::{ArtifactSource, RepositoryClient, RepositoryDescriptor};

/// Flat, direct-dependency resolver. Deliberately performs no transitive
/// expansion — root coordinates are leaves, matching the non-transitive
/// dependency policy of the plugins this serves.
pub struct Resolver {
    source: Arc<dyn ArtifactSource>,
    cache: Arc<ArtifactCache>,
    config: ResolverConfig,
}

impl Resolver {
    /// Build a resolver over the given repositories and cache handle.
    pub fn new(
        repositories: Vec<RepositoryDescriptor>,
        cache: Arc<ArtifactCache>,
        config: ResolverConfig,
    ) -> ResolverResult<Self> {
        let client = RepositoryClient::new(repositories, config.clone())?;
        Self::with_source(Arc::new(client), cache, config)
    }

    /// Build a resolver over an arbitrary artifact source (test seam).
    pub fn with_source(
        source: Arc<dyn ArtifactSource>,
        cache: Arc<ArtifactCache>,
        config: ResolverConfig,
    ) -> ResolverResult<Self> {
        if config.transitive {
            return Err(ResolverError::Unsupported(
                "transitive resolution is not implemented; this resolver is intentionally flat"
                    .to_string(),
            ));
        }
        Ok(Self {
            source,
            cache,
            config,
        })
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    /// Run a resolution to completion.
    pub async fn resolve(&self, request: &ResolutionRequest) -> ResolutionReport {
        self.resolve_cancellable(request, &CancelToken::new()).await
    }

    /// Run a resolution with cooperative cancellation.
    pub async fn resolve_cancellable(
        &self,
        request: &ResolutionRequest,
        cancel: &CancelToken,
    ) -> ResolutionReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut failures: Vec<UnresolvedArtifact> = Vec::new();

        info!(
            "Resolution {} started: {} root(s)",
            run_id,
            request.roots().len()
        );

        // ── FetchingMetadata: parse roots, pin floating versions ──
        let mut state = transition(run_id, RunState::Pending, RunState::FetchingMetadata);
        let mut parsed: Vec<Coordinate> = Vec::new();
        for raw in request.roots() {
            if cancel.is_cancelled() {
                break;
            }
            match Coordinate::parse(raw) {
                Ok(coordinate) if coordinate.is_floating() => {
                    match self.pin_floating(&coordinate, cancel).await {
                        Ok(pinned) => parsed.push(pinned),
                        Err(e) => {
                            warn!("Cannot pin {}: {}", raw, e);
                            failures.push(UnresolvedArtifact::from_error(raw.clone(), &e));
                            if matches!(e, ResolverError::Cancelled) {
                                break;
                            }
                        }
                    }
                }
                Ok(coordinate) => parsed.push(coordinate),
                Err(e) => {
                    // Bad input fails this entry only, never the batch.
                    warn!("Skipping malformed root '{}': {}", raw, e);
                    failures.push(UnresolvedArtifact::from_error(raw.clone(), &e));
                }
            }
        }

        // ── BuildingGraph: flat work list, exclusions applied ──
        state = transition(run_id, state, RunState::BuildingGraph);
        let mut kept: Vec<Coordinate> = Vec::new();
        for coordinate in parsed {
            if request.is_excluded(&coordinate) {
                info!("Excluded {} by rule", coordinate);
                continue;
            }
            kept.push(coordinate);
        }

        // ── ResolvingConflicts: one winner per group:artifact ──
        // This completes for every key before any fetch begins.
        state = transition(run_id, state, RunState::ResolvingConflicts);
        let winners = self.collapse_conflicts(kept);

        // ── FetchingArtifacts: cache-first, bounded parallelism ──
        state = transition(run_id, state, RunState::FetchingArtifacts);
        let mut artifacts: Vec<ResolvedArtifact> = Vec::new();
        if !cancel.is_cancelled() {
            let mut results: Vec<(usize, String, ResolverResult<ResolvedArtifact>)> =
                stream::iter(winners.into_iter().enumerate())
                    .map(|(idx, coordinate)| {
                        let cancel = cancel.clone();
                        async move {
                            let raw = coordinate.to_string();
                            let result =
                                with_cancel(&cancel, self.fetch_one(&coordinate)).await;
                            (idx, raw, result)
                        }
                    })
                    .buffer_unordered(self.config.download_concurrency)
                    .collect()
                    .await;
            // buffer_unordered completes out of order; restore request order.
            results.sort_by_key(|(idx, _, _)| *idx);

            for (_, raw, result) in results {
                match result {
                    Ok(artifact) => artifacts.push(artifact),
                    Err(e) => {
                        warn!("Unresolved {}: {}", raw, e);
                        failures.push(UnresolvedArtifact::from_error(raw, &e));
                    }
                }
            }
        }

        // ── Terminal state ──
        let cancelled = cancel.is_cancelled()
            || failures
                .iter()
                .any(|f| f.reason == super::report::FailureReason::Cancelled);
        let terminal = if cancelled {
            RunState::Cancelled
        } else if failures.is_empty() {
            RunState::Complete
        } else {
            RunState::Failed
        };
        state = transition(run_id, state, terminal);

        info!(
            "Resolution {} finished: {:?}, {} resolved, {} failed",
            run_id,
            state,
            artifacts.len(),
            failures.len()
        );

        ResolutionReport {
            run_id,
            state,
            started_at,
            finished_at: Utc::now(),
            artifacts,
            failures,
        }
    }

    async fn pin_floating(
        &self,
        coordinate: &Coordinate,
        cancel: &CancelToken,
    ) -> ResolverResult<Coordinate> {
        let list = with_cancel(cancel, self.source.fetch_metadata(coordinate)).await?;
        let version = list.pin(&coordinate.version).ok_or_else(|| {
            ResolverError::NotFound(format!(
                "no published version to pin '{}' for {}",
                coordinate.version,
                coordinate.conflict_key()
            ))
        })?;
        debug!("Pinned {} -> {}", coordinate, version);
        Ok(coordinate.with_version(&version))
    }

    /// Group by `group:artifact` (first-occurrence order) and pick one
    /// winner per group by the configured policy. Newest-wins uses the
    /// segment ordering of `compare_versions`.
    fn collapse_conflicts(&self, coordinates: Vec<Coordinate>) -> Vec<Coordinate> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Coordinate>> = HashMap::new();
        for coordinate in coordinates {
            let key = coordinate.conflict_key();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(coordinate);
        }

        let mut winners = Vec::with_capacity(order.len());
        for key in order {
            let Some(group) = groups.remove(&key) else {
                continue;
            };
            let candidates = group.len();
            let winner = match self.config.conflict_policy {
                ConflictPolicy::FirstDeclared => group.into_iter().next(),
                ConflictPolicy::NewestWins => group
                    .into_iter()
                    .max_by(|a, b| compare_versions(&a.version, &b.version)),
            };
            let Some(winner) = winner else { continue };
            if candidates > 1 {
                debug!(
                    "Conflict in {}: {} candidates, selected {}",
                    key, candidates, winner.version
                );
            }
            winners.push(winner);
        }
        winners
    }

    /// Resolve one coordinate: cache hit short-circuits the network; a
    /// miss downloads, verifies, caches, and returns the entry. The
    /// single-flight lock makes concurrent callers for the same key share
    /// one download.
    async fn fetch_one(&self, coordinate: &Coordinate) -> ResolverResult<ResolvedArtifact> {
        let _guard = self.cache.lock_key(coordinate).await;

        if let Some(entry) = self.cache.lookup(coordinate).await? {
            return Ok(resolved_from(entry, CACHE_SOURCE.to_string()));
        }

        let fetched = self.source.fetch_artifact(coordinate).await?;
        let entry = self
            .cache
            .insert(coordinate, &fetched.bytes, &fetched.checksum)
            .await?;
        Ok(resolved_from(entry, fetched.source_repository))
    }
}

fn resolved_from(entry: CacheEntry, source_repository: String) -> ResolvedArtifact {
    ResolvedArtifact {
        coordinate: entry.coordinate,
        source_repository,
        local_path: entry.path,
        checksum: entry.checksum,
        size_bytes: entry.size_bytes,
    }
}

fn transition(run_id: Uuid, from: RunState, to: RunState) -> RunState {
    debug!("Resolution {}: {:?} -> {:?}", run_id, from, to);
    to
}

async fn with_cancel<T>(
    cancel: &CancelToken,
    fut: impl Future<Output = ResolverResult<T>>,
) -> ResolverResult<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ResolverError::Cancelled),
        result = fut => result,
    }
}
