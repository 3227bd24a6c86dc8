use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the resolver.
/// Every module returns `Result<T, ResolverError>`.
#[derive(Debug, Error)]
pub enum ResolverError {
    // ── Coordinates ─────────────────────────────────────
    #[error("Malformed coordinate: {0}")]
    MalformedCoordinate(String),

    // ── Resolution ──────────────────────────────────────
    #[error("Artifact not found in any repository: {0}")]
    NotFound(String),

    #[error("{algorithm} mismatch for {coordinate}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        coordinate: String,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Injection ───────────────────────────────────────
    #[error("Injection conflict: {0}")]
    InjectionConflict(String),

    #[error("Class or resource not found in scope: {0}")]
    ScopeMiss(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── XML / JSON ──────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Jar read error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type ResolverResult<T> = Result<T, ResolverError>;

impl ResolverError {
    /// IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolverError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a fetch failure is transient and worth retrying
    /// (timeouts, connection errors, 5xx). A 404 is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ResolverError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ResolverError::DownloadFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
