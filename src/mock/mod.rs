//! Mock collaborators for tests.
//!
//! Configurable fakes for the two external seams: the build executor and
//! the cache backend. Shipped in the library so integration tests can
//! inject them into the orchestrator.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::{ArtifactRef, CacheError, CacheStore};
use crate::executor::{BuildExecutor, BuildFailure, BuildProducts};
use crate::options::{BuildOptions, PackageIdentity};
use crate::platform::PlatformIdentity;

/// Configurable mock build executor.
///
/// Writes a marker artifact per invocation, counts builds per SDK, and can
/// be scripted to fail specific SDKs or to sleep (for concurrency and
/// cancellation tests).
#[derive(Debug, Default)]
pub struct MockExecutor {
    /// Build invocation counts keyed by sdk_name
    builds: Mutex<HashMap<String, usize>>,
    /// SDKs scripted to fail
    failing_sdks: Mutex<HashMap<String, String>>,
    /// Artificial per-build delay
    delay: Option<Duration>,
    /// Token to fire mid-build (cancellation tests)
    cancel_on_build: Option<crate::cancel::CancelToken>,
}

impl MockExecutor {
    /// Create a mock that succeeds for every SDK
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for one SDK
    pub fn fail_sdk(self, sdk_name: &str, diagnostics: &str) -> Self {
        self.failing_sdks
            .lock()
            .unwrap()
            .insert(sdk_name.to_string(), diagnostics.to_string());
        self
    }

    /// Sleep for `delay` inside each build
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fire the token as soon as a build starts, so the build in flight is
    /// observed as cancelled and later units are never attempted
    pub fn cancel_during_build(mut self, token: crate::cancel::CancelToken) -> Self {
        self.cancel_on_build = Some(token);
        self
    }

    /// Number of builds executed for an SDK
    pub fn build_count(&self, sdk_name: &str) -> usize {
        self.builds
            .lock()
            .unwrap()
            .get(sdk_name)
            .copied()
            .unwrap_or(0)
    }

    /// Total builds executed across all SDKs
    pub fn total_builds(&self) -> usize {
        self.builds.lock().unwrap().values().sum()
    }
}

impl BuildExecutor for MockExecutor {
    fn execute(
        &self,
        package: &PackageIdentity,
        platform: &PlatformIdentity,
        _options: &BuildOptions,
        output_dir: &Path,
    ) -> Result<BuildProducts, BuildFailure> {
        *self
            .builds
            .lock()
            .unwrap()
            .entry(platform.sdk_name.to_string())
            .or_insert(0) += 1;

        if let Some(token) = &self.cancel_on_build {
            token.cancel();
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if let Some(diagnostics) = self.failing_sdks.lock().unwrap().get(platform.sdk_name) {
            return Err(BuildFailure {
                sdk_name: platform.sdk_name.to_string(),
                diagnostics: diagnostics.clone(),
            });
        }

        std::fs::create_dir_all(output_dir).map_err(|e| BuildFailure {
            sdk_name: platform.sdk_name.to_string(),
            diagnostics: e.to_string(),
        })?;
        std::fs::write(
            output_dir.join(format!("{}.framework", package.name)),
            format!("{} built for {}", package, platform.sdk_name),
        )
        .map_err(|e| BuildFailure {
            sdk_name: platform.sdk_name.to_string(),
            diagnostics: e.to_string(),
        })?;

        Ok(BuildProducts {
            artifact_dir: output_dir.to_path_buf(),
        })
    }
}

/// In-memory cache backend with failure injection.
///
/// Entries record the artifact directory path rather than copying bytes;
/// `materialize` writes a marker file so tests can observe restoration.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, PathBuf>>,
    fail_store: AtomicBool,
    fail_materialize: AtomicBool,
    lookups: AtomicUsize,
    stores: AtomicUsize,
}

impl MemoryCache {
    /// Create an empty in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `store` call fail
    pub fn set_fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    /// Make every `materialize` call fail
    pub fn set_fail_materialize(&self, fail: bool) {
        self.fail_materialize.store(fail, Ordering::SeqCst);
    }

    /// Number of lookup calls observed
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of successful store calls observed
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Whether an entry exists for a fingerprint
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Seed an entry directly (simulating a prior run)
    pub fn insert(&self, key: &str, location: impl Into<PathBuf>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), location.into());
    }
}

impl CacheStore for MemoryCache {
    fn lookup(&self, key: &str) -> Result<Option<ArtifactRef>, CacheError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|location| ArtifactRef {
                key: key.to_string(),
                location: location.clone(),
            }))
    }

    fn store(&self, key: &str, artifact_dir: &Path) -> Result<(), CacheError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(CacheError::StoreFailed("injected store failure".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), artifact_dir.to_path_buf());
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn materialize(&self, artifact: &ArtifactRef, destination: &Path) -> Result<(), CacheError> {
        if self.fail_materialize.load(Ordering::SeqCst) {
            return Err(CacheError::MaterializeFailed(
                "injected materialize failure".to_string(),
            ));
        }
        std::fs::create_dir_all(destination)
            .map_err(|e| CacheError::MaterializeFailed(e.to_string()))?;
        std::fs::write(
            destination.join(".materialized"),
            artifact.key.as_bytes(),
        )
        .map_err(|e| CacheError::MaterializeFailed(e.to_string()))?;
        Ok(())
    }
}
