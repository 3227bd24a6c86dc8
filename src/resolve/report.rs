// ─── Resolution Report ───
// Structured outcome of a resolution run, serializable so the host can
// log or persist it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::checksum::Checksum;
use crate::coordinate::Coordinate;
use crate::error::{ResolverError, ResolverResult};

/// Marker used as `source_repository` when an artifact came out of the
/// local cache instead of the network.
pub const CACHE_SOURCE: &str = "local-cache";

/// One successfully resolved artifact, ready for injection. The file it
/// points at is owned by the cache; consumers treat it read-only.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub source_repository: String,
    pub local_path: PathBuf,
    pub checksum: Checksum,
    pub size_bytes: u64,
}

/// Why a coordinate could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Malformed,
    NotFound,
    ChecksumMismatch,
    NetworkError,
    Cancelled,
}

/// A per-coordinate failure. Partial failures never silently drop
/// artifacts — every unresolved root appears here by name.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedArtifact {
    pub coordinate: String,
    pub reason: FailureReason,
    pub detail: String,
}

impl UnresolvedArtifact {
    pub fn from_error(coordinate: impl Into<String>, error: &ResolverError) -> Self {
        let reason = match error {
            ResolverError::MalformedCoordinate(_) => FailureReason::Malformed,
            ResolverError::ChecksumMismatch { .. } => FailureReason::ChecksumMismatch,
            ResolverError::Http(_) | ResolverError::DownloadFailed { .. } => {
                FailureReason::NetworkError
            }
            ResolverError::Cancelled => FailureReason::Cancelled,
            _ => FailureReason::NotFound,
        };
        Self {
            coordinate: coordinate.into(),
            reason,
            detail: error.to_string(),
        }
    }
}

/// States a resolution run moves through. Terminal states are `Complete`,
/// `Failed` and `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    FetchingMetadata,
    BuildingGraph,
    ResolvingConflicts,
    FetchingArtifacts,
    Complete,
    Failed,
    Cancelled,
}

/// Full outcome of one run: either the ordered resolved artifact list, or
/// a failure report naming each unresolved coordinate and the reason.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub run_id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Original request order, conflicts collapsed to winners.
    pub artifacts: Vec<ResolvedArtifact>,
    pub failures: Vec<UnresolvedArtifact>,
}

impl ResolutionReport {
    pub fn is_complete(&self) -> bool {
        self.state == RunState::Complete
    }

    pub fn to_json(&self) -> ResolverResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
