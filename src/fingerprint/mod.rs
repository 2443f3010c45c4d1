//! Cache fingerprint derivation.
//!
//! A fingerprint is the SHA-256 hex digest of the RFC 8785 (JCS) canonical
//! JSON form of the output-affecting inputs: package identity, build
//! configuration, debug-symbol policy, and SDK name. Canonicalization makes
//! the key independent of field ordering, process, and time.
//!
//! Inputs that do not affect the produced artifact's bytes or ABI — the
//! request tag, display names, destination strings — are deliberately
//! absent from the input struct.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::options::{BuildConfiguration, BuildOptions, PackageIdentity};
use crate::platform::PlatformIdentity;

/// Schema identifier versioning the fingerprint input shape. Changing the
/// shape of `FingerprintInputs` requires bumping this, which invalidates
/// all prior cache entries rather than colliding with them.
pub const FINGERPRINT_SCHEMA_ID: &str = "xcf-forge/fingerprint@1";

/// Errors during fingerprint derivation
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// JCS canonicalization failed
    #[error("canonicalization error: {0}")]
    Canonicalization(String),
}

/// The canonical, output-affecting inputs hashed into a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintInputs {
    /// Input shape version
    pub schema_id: String,
    /// Package name
    pub package_name: String,
    /// Package content revision
    pub package_revision: String,
    /// Build configuration
    pub configuration: BuildConfiguration,
    /// Debug-symbol policy
    pub debug_symbols_embedded: bool,
    /// Canonical SDK name of the target
    pub sdk_name: String,
}

impl FingerprintInputs {
    /// Assemble the inputs for one (package, options, platform) triple
    pub fn new(
        package: &PackageIdentity,
        options: &BuildOptions,
        platform: &PlatformIdentity,
    ) -> Self {
        Self {
            schema_id: FINGERPRINT_SCHEMA_ID.to_string(),
            package_name: package.name.clone(),
            package_revision: package.revision.clone(),
            configuration: options.configuration,
            debug_symbols_embedded: options.debug_symbols_embedded,
            sdk_name: platform.sdk_name.to_string(),
        }
    }

    /// Compute the fingerprint: SHA-256 hex digest of JCS(self)
    pub fn compute(&self) -> Result<String, FingerprintError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(self)
            .map_err(|e| FingerprintError::Canonicalization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Derive the cache fingerprint for one build unit
pub fn derive(
    package: &PackageIdentity,
    options: &BuildOptions,
    platform: &PlatformIdentity,
) -> Result<String, FingerprintError> {
    FingerprintInputs::new(package, options, platform).compute()
}
