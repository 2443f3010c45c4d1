//! Filesystem cache backend.
//!
//! Layout: `root/<key[..2]>/<key>/` holding a copy of the artifact
//! directory plus a `.entry.json` metadata file. The two-character shard
//! keeps directory fan-out bounded for large caches.
//!
//! A missing or unreadable metadata file makes the entry invisible (a miss)
//! rather than an error; a corrupt cache entry must never abort a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{ArtifactRef, CacheError, CacheStore};

/// Schema version for cache entry metadata
pub const CACHE_ENTRY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for cache entry metadata
pub const CACHE_ENTRY_SCHEMA_ID: &str = "xcf-forge/cache_entry@1";

/// Metadata file name inside each cache entry directory
pub const CACHE_ENTRY_FILENAME: &str = ".entry.json";

/// Metadata describing one cached artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Schema version
    pub schema_version: u32,
    /// Schema identifier
    pub schema_id: String,
    /// Fingerprint this entry is keyed by
    pub key: String,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create metadata for a new entry
    pub fn new(key: &str) -> Self {
        Self {
            schema_version: CACHE_ENTRY_SCHEMA_VERSION,
            schema_id: CACHE_ENTRY_SCHEMA_ID.to_string(),
            key: key.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Durable cache backend rooted at a filesystem directory
#[derive(Debug)]
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    /// Create a backend rooted at `root`. The directory is created lazily
    /// on first store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this cache
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        let shard = if key.len() >= 2 { &key[..2] } else { key };
        self.root.join(shard).join(key)
    }
}

impl CacheStore for LocalCacheStore {
    fn lookup(&self, key: &str) -> Result<Option<ArtifactRef>, CacheError> {
        let dir = self.entry_dir(key);
        let meta_path = dir.join(CACHE_ENTRY_FILENAME);
        if !meta_path.exists() {
            return Ok(None);
        }

        // Unreadable or mismatched metadata is a miss, not an error.
        let entry: CacheEntry = match fs::read_to_string(&meta_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.key != key {
            return Ok(None);
        }

        Ok(Some(ArtifactRef {
            key: key.to_string(),
            location: dir,
        }))
    }

    fn store(&self, key: &str, artifact_dir: &Path) -> Result<(), CacheError> {
        let dir = self.entry_dir(key);

        // Replace any partial prior entry wholesale.
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| CacheError::StoreFailed(format!("{}: {}", dir.display(), e)))?;
        }
        fs::create_dir_all(&dir)
            .map_err(|e| CacheError::StoreFailed(format!("{}: {}", dir.display(), e)))?;

        copy_tree(artifact_dir, &dir).map_err(|e| {
            CacheError::StoreFailed(format!("copying {}: {}", artifact_dir.display(), e))
        })?;

        // Metadata written last; its presence marks the entry complete.
        let entry = CacheEntry::new(key);
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| CacheError::StoreFailed(e.to_string()))?;
        fs::write(dir.join(CACHE_ENTRY_FILENAME), json)
            .map_err(|e| CacheError::StoreFailed(e.to_string()))?;

        Ok(())
    }

    fn materialize(&self, artifact: &ArtifactRef, destination: &Path) -> Result<(), CacheError> {
        let meta_path = artifact.location.join(CACHE_ENTRY_FILENAME);
        if !meta_path.exists() {
            return Err(CacheError::MaterializeFailed(format!(
                "cache entry vanished: {}",
                artifact.location.display()
            )));
        }

        fs::create_dir_all(destination)
            .map_err(|e| CacheError::MaterializeFailed(e.to_string()))?;

        copy_tree_excluding(&artifact.location, destination, CACHE_ENTRY_FILENAME).map_err(|e| {
            CacheError::MaterializeFailed(format!("{}: {}", artifact.location.display(), e))
        })
    }
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    copy_tree_excluding(src, dst, "")
}

fn copy_tree_excluding(src: &Path, dst: &Path, exclude: &str) -> std::io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        if !exclude.is_empty() && rel == Path::new(exclude) {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_artifact(dir: &Path) {
        fs::create_dir_all(dir.join("Frameworks")).unwrap();
        fs::write(dir.join("Frameworks").join("MyLib.bin"), b"binary bytes").unwrap();
        fs::write(dir.join("Info.plist"), b"<plist/>").unwrap();
    }

    #[test]
    fn test_lookup_misses_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));
        assert!(cache.lookup("abcd1234").unwrap().is_none());
    }

    #[test]
    fn test_store_then_lookup_hits() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));

        let artifact = temp.path().join("out");
        make_artifact(&artifact);

        cache.store("abcd1234", &artifact).unwrap();
        let hit = cache.lookup("abcd1234").unwrap().expect("should hit");
        assert_eq!(hit.key, "abcd1234");
    }

    #[test]
    fn test_materialize_restores_artifact_tree() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));

        let artifact = temp.path().join("out");
        make_artifact(&artifact);
        cache.store("abcd1234", &artifact).unwrap();

        let hit = cache.lookup("abcd1234").unwrap().unwrap();
        let restored = temp.path().join("restored");
        cache.materialize(&hit, &restored).unwrap();

        let bytes = fs::read(restored.join("Frameworks").join("MyLib.bin")).unwrap();
        assert_eq!(bytes, b"binary bytes");
        // Metadata is backend-internal and must not leak into the output.
        assert!(!restored.join(CACHE_ENTRY_FILENAME).exists());
    }

    #[test]
    fn test_corrupt_metadata_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));

        let artifact = temp.path().join("out");
        make_artifact(&artifact);
        cache.store("abcd1234", &artifact).unwrap();

        let meta = temp
            .path()
            .join("cache")
            .join("ab")
            .join("abcd1234")
            .join(CACHE_ENTRY_FILENAME);
        fs::write(&meta, "not json").unwrap();

        assert!(cache.lookup("abcd1234").unwrap().is_none());
    }

    #[test]
    fn test_store_replaces_prior_entry() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));

        let artifact1 = temp.path().join("out1");
        make_artifact(&artifact1);
        cache.store("abcd1234", &artifact1).unwrap();

        let artifact2 = temp.path().join("out2");
        fs::create_dir_all(&artifact2).unwrap();
        fs::write(artifact2.join("only.bin"), b"v2").unwrap();
        cache.store("abcd1234", &artifact2).unwrap();

        let hit = cache.lookup("abcd1234").unwrap().unwrap();
        let restored = temp.path().join("restored");
        cache.materialize(&hit, &restored).unwrap();
        assert!(restored.join("only.bin").exists());
        assert!(!restored.join("Info.plist").exists());
    }

    #[test]
    fn test_materialize_vanished_entry_fails_gracefully() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCacheStore::new(temp.path().join("cache"));

        let artifact = temp.path().join("out");
        make_artifact(&artifact);
        cache.store("abcd1234", &artifact).unwrap();
        let hit = cache.lookup("abcd1234").unwrap().unwrap();

        fs::remove_dir_all(&hit.location).unwrap();

        let result = cache.materialize(&hit, &temp.path().join("restored"));
        assert!(matches!(result, Err(CacheError::MaterializeFailed(_))));
    }
}
