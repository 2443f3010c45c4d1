//! Run configuration.
//!
//! Layered merge, smallest wins last: built-in defaults, then an optional
//! `xcf-forge.toml` in the package directory, then CLI flags (applied by
//! the caller). The file controls operational knobs only — nothing in it
//! participates in cache fingerprints.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cache::CacheMode;

/// Config file name looked up in the package directory
pub const CONFIG_FILENAME: &str = "xcf-forge.toml";

/// Default concurrency: sequential, the external toolchain is the scarce
/// resource
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Errors loading the run config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid cache_policy: {0} (must be 'disabled', 'project', or 'local')")]
    InvalidCachePolicy(String),

    #[error("cache_policy 'local' requires cache_path")]
    MissingCachePath,
}

/// Raw file shape
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    concurrency: Option<usize>,
    cache_policy: Option<String>,
    cache_path: Option<PathBuf>,
}

/// Effective run configuration after the file layer is applied
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum units processed concurrently
    pub concurrency: usize,
    /// Cache backend selection
    pub cache_mode: CacheMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            cache_mode: CacheMode::Project,
        }
    }
}

impl RunConfig {
    /// Load the config for a package directory, falling back to defaults
    /// when no file exists.
    pub fn load(package_dir: &Path) -> Result<Self, ConfigError> {
        let path = package_dir.join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;

        let mut config = Self::default();
        if let Some(concurrency) = file.concurrency {
            config.concurrency = concurrency.max(1);
        }
        if let Some(policy) = file.cache_policy {
            config.cache_mode = parse_cache_policy(&policy, file.cache_path)?;
        }
        Ok(config)
    }
}

/// Parse a cache-policy name plus optional path into a `CacheMode`
pub fn parse_cache_policy(
    policy: &str,
    cache_path: Option<PathBuf>,
) -> Result<CacheMode, ConfigError> {
    match policy {
        "disabled" => Ok(CacheMode::Disabled),
        "project" => Ok(CacheMode::Project),
        "local" => cache_path
            .map(CacheMode::Local)
            .ok_or(ConfigError::MissingCachePath),
        other => Err(ConfigError::InvalidCachePolicy(other.to_string())),
    }
}
