// ─── Resolver Configuration ───
// Host-supplied tuning knobs. Config *file* parsing is the host's concern;
// this crate only takes the final values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a conflict group with multiple versions picks its winner.
///
/// The default is `NewestWins`. The manifests this resolver was built for
/// give no evidence either way, so the policy stays configurable instead
/// of hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Highest version by segment ordering wins.
    NewestWins,
    /// The version declared first in the request wins.
    FirstDeclared,
}

/// Tuning values for a resolver instance.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Per-request connect timeout.
    pub connect_timeout: Duration,
    /// Per-request read timeout.
    pub read_timeout: Duration,
    /// Absolute attempt bound for transient network failures.
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_backoff: Duration,
    /// Maximum parallel artifact downloads.
    pub download_concurrency: usize,
    /// Conflict resolution policy.
    pub conflict_policy: ConflictPolicy,
    /// Transitive resolution is a scoped extension point. This resolver is
    /// intentionally flat (the source manifests disable transitive pull-in);
    /// enabling the flag is rejected until the graph walker exists.
    pub transitive: bool,
    /// User agent sent with every HTTP request.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(250),
            download_concurrency: 6,
            conflict_policy: ConflictPolicy::NewestWins,
            transitive: false,
            user_agent: concat!("runtime-resolver/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_download_concurrency(mut self, n: usize) -> Self {
        self.download_concurrency = n.max(1);
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = ResolverConfig::default();
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.conflict_policy, ConflictPolicy::NewestWins);
        assert!(!cfg.transitive);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn concurrency_never_zero() {
        let cfg = ResolverConfig::default().with_download_concurrency(0);
        assert_eq!(cfg.download_concurrency, 1);
    }
}
