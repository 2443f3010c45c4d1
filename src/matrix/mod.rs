//! Matrix expansion: one build request into ordered build units.
//!
//! Expansion is deterministic and order-stable: families iterate in their
//! canonical lexicographic order (the `BTreeSet` in `BuildOptions`), and
//! each family expands device-before-simulator. Identical inputs always
//! yield the same unit sequence, so logs and reports are reproducible.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::fingerprint::{self, FingerprintError};
use crate::options::{BuildOptions, OptionsError, PackageIdentity};
use crate::platform::{identities_for, PlatformIdentity};

/// Errors during matrix expansion
#[derive(Debug, Error)]
pub enum ExpandError {
    /// The request had no platforms
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),

    /// Fingerprint derivation failed for a unit
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// One schedulable piece of work: a (package, platform identity) pair with
/// its derived cache fingerprint.
///
/// Units are created at expansion time and never mutated; lifecycle state
/// is tracked by the orchestrator. Only the artifact, keyed by
/// `fingerprint`, outlives the run.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    /// Unique unit identifier (sortable, filesystem-safe)
    pub id: String,
    /// The package this unit builds
    pub package: PackageIdentity,
    /// Concrete target platform
    pub platform: PlatformIdentity,
    /// The options this unit was expanded from (shared, read-only)
    pub options: Arc<BuildOptions>,
    /// Derived cache key
    pub fingerprint: String,
}

/// Generate a unit identifier using ULID (sortable, filesystem-safe)
pub fn generate_unit_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// Generate a run identifier using ULID
pub fn generate_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// Expand a build request into its ordered, deduplicated unit list.
///
/// Fails with `EmptyPlatformSet` before any work starts. Dedup is by
/// `sdk_name`: the closed catalog cannot produce collisions today, but the
/// contract holds regardless of what the catalog maps families to.
pub fn expand(
    package: &PackageIdentity,
    options: &BuildOptions,
) -> Result<Vec<BuildUnit>, ExpandError> {
    options.validate()?;

    let shared = Arc::new(options.clone());
    let mut seen: HashSet<&'static str> = HashSet::new();
    let mut units = Vec::new();

    for family in &options.platforms {
        for platform in identities_for(*family, options.simulator_support) {
            if !seen.insert(platform.sdk_name) {
                continue;
            }
            let fingerprint = fingerprint::derive(package, options, &platform)?;
            units.push(BuildUnit {
                id: generate_unit_id(),
                package: package.clone(),
                platform,
                options: Arc::clone(&shared),
                fingerprint,
            });
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfiguration;
    use crate::platform::{Family, Variant};

    fn make_package() -> PackageIdentity {
        PackageIdentity::new("MyLib", "a1b2c3d")
    }

    #[test]
    fn test_expand_ios_and_macos_with_simulators() {
        let options = BuildOptions::new(BuildConfiguration::Release, [Family::Ios, Family::MacOs])
            .with_simulator_support(true);

        let units = expand(&make_package(), &options).unwrap();

        let targets: Vec<(Family, Variant)> = units
            .iter()
            .map(|u| (u.platform.family, u.platform.variant))
            .collect();
        assert_eq!(
            targets,
            vec![
                (Family::Ios, Variant::Device),
                (Family::Ios, Variant::Simulator),
                (Family::MacOs, Variant::Device),
            ]
        );
    }

    #[test]
    fn test_expand_order_is_reproducible() {
        let options = BuildOptions::new(
            BuildConfiguration::Release,
            [Family::Watchos, Family::Ios, Family::Tvos],
        )
        .with_simulator_support(true);

        let first: Vec<&str> = expand(&make_package(), &options)
            .unwrap()
            .iter()
            .map(|u| u.platform.sdk_name)
            .collect();

        for _ in 0..3 {
            let again: Vec<&str> = expand(&make_package(), &options)
                .unwrap()
                .iter()
                .map(|u| u.platform.sdk_name)
                .collect();
            assert_eq!(first, again);
        }

        assert_eq!(
            first,
            vec![
                "iphoneos",
                "iphonesimulator",
                "appletvos",
                "appletvsimulator",
                "watchos",
                "watchsimulator",
            ]
        );
    }

    #[test]
    fn test_expand_empty_platform_set_fails() {
        let options = BuildOptions::new(BuildConfiguration::Release, []);
        let result = expand(&make_package(), &options);
        assert!(matches!(
            result,
            Err(ExpandError::InvalidOptions(OptionsError::EmptyPlatformSet))
        ));
    }

    #[test]
    fn test_expanded_units_have_distinct_fingerprints() {
        let options = BuildOptions::new(BuildConfiguration::Release, [Family::Ios, Family::Tvos])
            .with_simulator_support(true);

        let units = expand(&make_package(), &options).unwrap();
        let mut keys: Vec<&String> = units.iter().map(|u| &u.fingerprint).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), units.len());
    }

    #[test]
    fn test_expanded_units_share_options() {
        let options = BuildOptions::new(BuildConfiguration::Release, [Family::Ios])
            .with_simulator_support(true);

        let units = expand(&make_package(), &options).unwrap();
        assert_eq!(units.len(), 2);
        assert!(Arc::ptr_eq(&units[0].options, &units[1].options));
    }

    #[test]
    fn test_unit_ids_are_unique() {
        let options = BuildOptions::new(BuildConfiguration::Release, Family::ALL)
            .with_simulator_support(true);

        let units = expand(&make_package(), &options).unwrap();
        assert_eq!(units.len(), 8);
        let mut ids: Vec<&String> = units.iter().map(|u| &u.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
