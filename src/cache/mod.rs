//! Artifact cache abstraction.
//!
//! A `CacheStore` answers three questions: has this fingerprint been built
//! before (`lookup`), record a built artifact under a fingerprint (`store`),
//! and copy a prior artifact into the current run's output (`materialize`).
//!
//! Backends are interchangeable and chosen once per run via `CacheMode`.
//! The orchestrator downgrades every cache failure: a failed lookup is a
//! miss, a failed materialize falls through to a rebuild, and a failed
//! store leaves the unit's artifact usable for this run only.

mod local;

pub use local::{CacheEntry, LocalCacheStore, CACHE_ENTRY_FILENAME};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Cache backend selection, chosen once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    /// No lookup, no store
    Disabled,
    /// Conventional per-package location under the package's build directory
    Project,
    /// Explicit filesystem location
    Local(PathBuf),
}

/// Errors from cache backends
#[derive(Debug, Error)]
pub enum CacheError {
    /// Storing an artifact failed; the artifact is still produced for this
    /// run but will not be reusable by future runs
    #[error("failed to store cache entry: {0}")]
    StoreFailed(String),

    /// Materializing a hit failed; treated as a cache miss, never fatal
    #[error("failed to materialize cache entry: {0}")]
    MaterializeFailed(String),

    /// Backend I/O error during lookup
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reference to a cached artifact returned by a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Fingerprint the artifact is stored under
    pub key: String,
    /// Backend-specific location of the cached artifact
    pub location: PathBuf,
}

/// Capability-set interface over a cache backend.
///
/// Implementations own their internal consistency; `lookup` and `store`
/// calls for distinct keys may run concurrently without coordination.
pub trait CacheStore: Send + Sync {
    /// Look up a fingerprint. `Ok(None)` is a miss. Never mutates.
    fn lookup(&self, key: &str) -> Result<Option<ArtifactRef>, CacheError>;

    /// Record the artifact directory under a fingerprint.
    fn store(&self, key: &str, artifact_dir: &Path) -> Result<(), CacheError>;

    /// Copy a previously stored artifact into `destination`.
    fn materialize(&self, artifact: &ArtifactRef, destination: &Path) -> Result<(), CacheError>;
}

/// No-op backend for `CacheMode::Disabled`.
///
/// Lookup always misses and store always succeeds, so the orchestration
/// logic stays backend-agnostic.
#[derive(Debug, Default)]
pub struct DisabledCache;

impl CacheStore for DisabledCache {
    fn lookup(&self, _key: &str) -> Result<Option<ArtifactRef>, CacheError> {
        Ok(None)
    }

    fn store(&self, _key: &str, _artifact_dir: &Path) -> Result<(), CacheError> {
        Ok(())
    }

    fn materialize(&self, artifact: &ArtifactRef, _destination: &Path) -> Result<(), CacheError> {
        // Unreachable through the orchestrator: lookup never hits.
        Err(CacheError::MaterializeFailed(format!(
            "cache is disabled, no entry for {}",
            artifact.key
        )))
    }
}

/// Resolve a `CacheMode` to a concrete backend.
///
/// `Project` mode keys the cache to the package directory's conventional
/// build location; `Local` uses the explicit path as-is.
pub fn open_store(mode: &CacheMode, package_dir: &Path) -> Box<dyn CacheStore> {
    match mode {
        CacheMode::Disabled => Box::new(DisabledCache),
        CacheMode::Project => Box::new(LocalCacheStore::new(
            package_dir.join(".build").join("xcf-cache"),
        )),
        CacheMode::Local(root) => Box::new(LocalCacheStore::new(root.clone())),
    }
}
