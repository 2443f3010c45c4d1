//! The external build collaborator.
//!
//! The orchestrator treats the executor as an opaque, potentially slow,
//! potentially-failing black box. Retry logic, if any, belongs to the
//! executor, never to the orchestrator.

mod xcodebuild;

pub use xcodebuild::XcodebuildExecutor;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::options::{BuildOptions, PackageIdentity};
use crate::platform::PlatformIdentity;

/// A failed external build, with whatever diagnostics the toolchain gave
#[derive(Debug, Error)]
#[error("build failed for {sdk_name}: {diagnostics}")]
pub struct BuildFailure {
    /// SDK the failing unit targeted
    pub sdk_name: String,
    /// Toolchain diagnostics (tail of stderr, or a synthetic message)
    pub diagnostics: String,
}

/// Output of a successful external build
#[derive(Debug, Clone)]
pub struct BuildProducts {
    /// Directory holding the produced artifact for this unit
    pub artifact_dir: PathBuf,
}

/// One external build invocation per unit.
///
/// Implementations must tolerate concurrent calls for distinct units; the
/// orchestrator never issues two concurrent calls for the same fingerprint.
pub trait BuildExecutor: Send + Sync {
    /// Build one platform target of the package into `output_dir`.
    fn execute(
        &self,
        package: &PackageIdentity,
        platform: &PlatformIdentity,
        options: &BuildOptions,
        output_dir: &Path,
    ) -> Result<BuildProducts, BuildFailure>;
}
