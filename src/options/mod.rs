//! Build options and package identity value types.
//!
//! A `BuildOptions` describes one build request. It is immutable for the
//! lifetime of a run and shared read-only between build units, so no
//! synchronization on the options themselves is ever needed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Family;

/// Errors raised when validating a build request
#[derive(Debug, Error)]
pub enum OptionsError {
    /// An empty platform set is a configuration error, not a no-op
    #[error("platform set is empty; at least one platform family is required")]
    EmptyPlatformSet,

    /// Unknown configuration name
    #[error("invalid build configuration: {0} (must be 'debug' or 'release')")]
    InvalidConfiguration(String),
}

/// Build configuration, maps onto the toolchain's -configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildConfiguration {
    /// Unoptimized build with assertions
    Debug,
    /// Optimized build
    #[default]
    Release,
}

impl BuildConfiguration {
    /// The value passed to the external toolchain's configuration setting
    pub fn settings_value(&self) -> &'static str {
        match self {
            BuildConfiguration::Debug => "Debug",
            BuildConfiguration::Release => "Release",
        }
    }
}

impl std::fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildConfiguration::Debug => write!(f, "debug"),
            BuildConfiguration::Release => write!(f, "release"),
        }
    }
}

impl std::str::FromStr for BuildConfiguration {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildConfiguration::Debug),
            "release" => Ok(BuildConfiguration::Release),
            other => Err(OptionsError::InvalidConfiguration(other.to_string())),
        }
    }
}

/// Identity of the source package being built.
///
/// The revision is the content-addressed part: two checkouts with the same
/// name but different revisions must never share cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package name
    pub name: String,
    /// Content revision (git SHA, version, or equivalent)
    pub revision: String,
}

impl PackageIdentity {
    /// Create a new package identity
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
        }
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.revision)
    }
}

/// Immutable value describing one build request.
///
/// `platforms` uses a `BTreeSet` so iteration order is total and
/// reproducible (lexicographic by canonical family name), which keeps
/// expansion, logs, and reports stable across runs with identical input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Free-form label distinguishing otherwise-identical requests.
    /// Never participates in cache fingerprints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Build configuration; affects compiler flags and therefore output
    pub configuration: BuildConfiguration,

    /// When true, every device-class platform also gets a simulator unit
    pub simulator_support: bool,

    /// Whether debug symbols are embedded in the produced artifact
    pub debug_symbols_embedded: bool,

    /// Requested platform families (set semantics, duplicates collapse)
    pub platforms: BTreeSet<Family>,
}

impl BuildOptions {
    /// Create options for the given configuration and families
    pub fn new(
        configuration: BuildConfiguration,
        platforms: impl IntoIterator<Item = Family>,
    ) -> Self {
        Self {
            tag: None,
            configuration,
            simulator_support: false,
            debug_symbols_embedded: false,
            platforms: platforms.into_iter().collect(),
        }
    }

    /// Set the human-distinguishing tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Enable simulator expansion
    pub fn with_simulator_support(mut self, enabled: bool) -> Self {
        self.simulator_support = enabled;
        self
    }

    /// Enable embedded debug symbols
    pub fn with_debug_symbols_embedded(mut self, enabled: bool) -> Self {
        self.debug_symbols_embedded = enabled;
        self
    }

    /// Validate the request. An empty platform set is rejected here, before
    /// any work starts.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.platforms.is_empty() {
            return Err(OptionsError::EmptyPlatformSet);
        }
        Ok(())
    }
}
