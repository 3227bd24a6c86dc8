// ─── Local Cache ───
// Content-addressed on-disk store for verified artifacts. Append-only:
// entries are created once, read on every later resolution, and removed
// only by an explicit clear. Artifacts are immutable once published, so
// there is no automatic eviction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::checksum::{Checksum, ChecksumAlgorithm};
use crate::coordinate::Coordinate;
use crate::error::{ResolverError, ResolverResult};

/// An on-disk cache record. Created on first verified download, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub coordinate: Coordinate,
    pub path: PathBuf,
    pub checksum: Checksum,
    pub size_bytes: u64,
}

/// Handle to a cache root directory.
///
/// The cache is an explicit injected dependency of the resolver engine —
/// never process-wide state — so resolution runs stay independently
/// testable and a process can host several isolated caches.
pub struct ArtifactCache {
    root: PathBuf,
    /// Single-flight locks, one per cache key. An in-flight download for a
    /// coordinate blocks concurrent downloads of the same coordinate;
    /// readers of other keys are unaffected.
    inflight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Platform cache directory fallback, e.g. `~/.cache/runtime-resolver`.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("runtime-resolver")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path an artifact occupies under this cache root. Layout is
    /// stable across resolver versions so existing caches remain valid.
    pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(coordinate.cache_path())
    }

    fn checksum_path(artifact_path: &Path, algorithm: ChecksumAlgorithm) -> PathBuf {
        let mut name = artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push('.');
        name.push_str(algorithm.file_suffix());
        artifact_path.with_file_name(name)
    }

    /// Acquire the single-flight lock for a coordinate's cache key. Hold
    /// the guard across the lookup-fetch-insert sequence to deduplicate
    /// concurrent requests for the identical coordinate.
    pub async fn lock_key(&self, coordinate: &Coordinate) -> OwnedMutexGuard<()> {
        let key = coordinate.cache_path();
        let lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    // ── Read path ───────────────────────────────────────

    /// Look up a cached artifact, re-verifying it against the sibling
    /// checksum file. A corrupted or unverifiable entry is removed and
    /// reported as a miss so the caller re-downloads.
    pub async fn lookup(&self, coordinate: &Coordinate) -> ResolverResult<Option<CacheEntry>> {
        let path = self.artifact_path(coordinate);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ResolverError::io(&path, e)),
        };

        for algorithm in ChecksumAlgorithm::preference_order() {
            let sibling = Self::checksum_path(&path, *algorithm);
            let stored = match tokio::fs::read_to_string(&sibling).await {
                Ok(stored) => stored,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ResolverError::io(&sibling, e)),
            };

            let checksum = Checksum {
                algorithm: *algorithm,
                value: stored.trim().to_ascii_lowercase(),
            };
            if checksum.matches(&bytes) {
                debug!("Cache hit: {}", coordinate);
                return Ok(Some(CacheEntry {
                    coordinate: coordinate.clone(),
                    path,
                    checksum,
                    size_bytes: bytes.len() as u64,
                }));
            }

            warn!(
                "Cache entry corrupted for {} ({} digest differs), discarding",
                coordinate,
                algorithm.name()
            );
            self.evict(coordinate).await?;
            return Ok(None);
        }

        // Artifact file without any checksum sibling — an interrupted
        // insert. Unverifiable, so discard it.
        warn!("Cache entry for {} has no checksum sibling, discarding", coordinate);
        self.evict(coordinate).await?;
        Ok(None)
    }

    // ── Write path ──────────────────────────────────────

    /// Store verified bytes under the coordinate's cache key. The write is
    /// atomic: a temp file in the target directory is renamed into place,
    /// and the checksum sibling lands only after the artifact itself.
    /// Readers never observe a partially written artifact, and an aborted
    /// insert leaves no temp file behind.
    pub async fn insert(
        &self,
        coordinate: &Coordinate,
        bytes: &[u8],
        checksum: &Checksum,
    ) -> ResolverResult<CacheEntry> {
        let path = self.artifact_path(coordinate);
        let parent = path
            .parent()
            .ok_or_else(|| ResolverError::Other(format!("Cache path has no parent: {:?}", path)))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ResolverError::io(parent, e))?;

        let temp = parent.join(format!(".part-{}", Uuid::new_v4()));
        let guard = TempFileGuard::new(temp.clone());
        {
            let mut file = tokio::fs::File::create(&temp)
                .await
                .map_err(|e| ResolverError::io(&temp, e))?;
            file.write_all(bytes)
                .await
                .map_err(|e| ResolverError::io(&temp, e))?;
            file.sync_all()
                .await
                .map_err(|e| ResolverError::io(&temp, e))?;
        }
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| ResolverError::io(&path, e))?;
        guard.defuse();

        let sibling = Self::checksum_path(&path, checksum.algorithm);
        tokio::fs::write(&sibling, &checksum.value)
            .await
            .map_err(|e| ResolverError::io(&sibling, e))?;

        debug!("Cached {} ({} bytes)", coordinate, bytes.len());
        Ok(CacheEntry {
            coordinate: coordinate.clone(),
            path,
            checksum: checksum.clone(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Remove one entry (artifact plus checksum siblings).
    pub async fn evict(&self, coordinate: &Coordinate) -> ResolverResult<()> {
        let path = self.artifact_path(coordinate);
        remove_if_present(&path).await?;
        for algorithm in ChecksumAlgorithm::preference_order() {
            remove_if_present(&Self::checksum_path(&path, *algorithm)).await?;
        }
        Ok(())
    }

    /// Manual cache clear — the only supported eviction of the whole store.
    pub async fn clear(&self) -> ResolverResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResolverError::io(&self.root, e)),
        }
    }
}

async fn remove_if_present(path: &Path) -> ResolverResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ResolverError::io(path, e)),
    }
}

/// Removes the temp file on drop unless the rename succeeded. Covers both
/// write errors and cooperative cancellation (a dropped insert future runs
/// this drop).
struct TempFileGuard {
    path: PathBuf,
    armed: std::cell::Cell<bool>,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            armed: std::cell::Cell::new(true),
        }
    }

    fn defuse(&self) {
        self.armed.set(false);
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed.get() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumAlgorithm;
    use tempfile::TempDir;

    fn coordinate() -> Coordinate {
        Coordinate::parse("com.example:lib:1.2.0").unwrap()
    }

    #[tokio::test]
    async fn insert_then_lookup_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let sum = Checksum::of(ChecksumAlgorithm::Sha256, b"artifact-bytes");

        let stored = cache.insert(&coordinate(), b"artifact-bytes", &sum).await.unwrap();
        assert_eq!(stored.size_bytes, 14);
        assert!(stored.path.ends_with("com.example/lib/1.2.0/default.jar"));

        let entry = cache.lookup(&coordinate()).await.unwrap().unwrap();
        assert_eq!(entry.checksum, sum);
        assert_eq!(entry.size_bytes, 14);
    }

    #[tokio::test]
    async fn lookup_misses_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        assert!(cache.lookup(&coordinate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_entry_is_discarded() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let sum = Checksum::of(ChecksumAlgorithm::Sha256, b"original");
        cache.insert(&coordinate(), b"original", &sum).await.unwrap();

        // Flip the bytes behind the cache's back.
        let path = cache.artifact_path(&coordinate());
        std::fs::write(&path, b"tampered").unwrap();

        assert!(cache.lookup(&coordinate()).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn entry_without_checksum_sibling_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());

        let path = cache.artifact_path(&coordinate());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"orphan").unwrap();

        assert!(cache.lookup(&coordinate()).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn sha1_entries_remain_valid() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let sum = Checksum::of(ChecksumAlgorithm::Sha1, b"legacy");
        cache.insert(&coordinate(), b"legacy", &sum).await.unwrap();

        let entry = cache.lookup(&coordinate()).await.unwrap().unwrap();
        assert_eq!(entry.checksum.algorithm, ChecksumAlgorithm::Sha1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("store");
        let cache = ArtifactCache::new(&root);
        let sum = Checksum::of(ChecksumAlgorithm::Sha256, b"bytes");
        cache.insert(&coordinate(), b"bytes", &sum).await.unwrap();

        cache.clear().await.unwrap();
        assert!(!root.exists());
        // Clearing twice is fine.
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn lock_key_serializes_same_coordinate() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(ArtifactCache::new(temp.path()));

        let guard = cache.lock_key(&coordinate()).await;

        let contender = {
            let cache = cache.clone();
            tokio::spawn(async move {
                let _guard = cache.lock_key(&coordinate()).await;
            })
        };

        // The contender cannot finish while the first guard is held.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn lock_key_does_not_block_other_coordinates() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());

        let _a = cache.lock_key(&coordinate()).await;
        let other = Coordinate::parse("org.other:thing:2.0").unwrap();
        // Must not deadlock.
        let _b = cache.lock_key(&other).await;
    }

    #[tokio::test]
    async fn no_temp_files_survive_insert() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let sum = Checksum::of(ChecksumAlgorithm::Sha256, b"bytes");
        cache.insert(&coordinate(), b"bytes", &sum).await.unwrap();

        let dir = cache.artifact_path(&coordinate());
        let entries: Vec<_> = std::fs::read_dir(dir.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(entries.iter().all(|n| !n.starts_with(".part-")), "{:?}", entries);
    }
}
