//! xcf-forge - Cache-aware XCFramework build-matrix orchestrator
//!
//! Expands a build request (package + options) into an ordered set of
//! per-target build units, derives a deterministic cache fingerprint per
//! unit, skips units whose artifacts a cache backend can materialize, and
//! drives the remaining units through an external build executor with
//! partial-failure semantics.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod executor;
pub mod fingerprint;
pub mod matrix;
pub mod mock;
pub mod options;
pub mod orchestrator;
pub mod platform;
pub mod report;
pub mod state;

pub use cache::{CacheMode, CacheStore};
pub use cancel::CancelToken;
pub use executor::BuildExecutor;
pub use matrix::BuildUnit;
pub use options::{BuildConfiguration, BuildOptions, PackageIdentity};
pub use orchestrator::Orchestrator;
pub use platform::{Family, PlatformIdentity, Variant};
pub use report::RunReport;
pub use state::UnitState;
