//! Platform catalog: target families, device/simulator variants, and the
//! identity table consulted during matrix expansion.
//!
//! The catalog is a closed enumeration. All family/variant behavior lives in
//! the lookup tables here rather than scattered per-case branching, so the
//! expansion rule is testable in one place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for platform resolution
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Family name is not one of the supported platforms
    #[error("unsupported platform family: {0}")]
    UnsupportedFamily(String),
}

/// A target-platform family, before device/simulator expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// iOS devices and simulators
    Ios,
    /// Mac Catalyst (iPad apps on macOS)
    MacCatalyst,
    /// macOS
    MacOs,
    /// tvOS devices and simulators
    Tvos,
    /// watchOS devices and simulators
    Watchos,
}

impl Family {
    /// All supported families, in canonical (lexicographic) order
    pub const ALL: [Family; 5] = [
        Family::Ios,
        Family::MacCatalyst,
        Family::MacOs,
        Family::Tvos,
        Family::Watchos,
    ];

    /// Canonical lowercase name, as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Ios => "ios",
            Family::MacCatalyst => "maccatalyst",
            Family::MacOs => "macos",
            Family::Tvos => "tvos",
            Family::Watchos => "watchos",
        }
    }

    /// Whether this family has a simulator variant.
    ///
    /// macOS and Mac Catalyst build for the host and have none.
    pub fn has_simulator(&self) -> bool {
        match self {
            Family::MacOs | Family::MacCatalyst => false,
            Family::Ios | Family::Tvos | Family::Watchos => true,
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Family::Ios),
            "maccatalyst" => Ok(Family::MacCatalyst),
            "macos" => Ok(Family::MacOs),
            "tvos" => Ok(Family::Tvos),
            "watchos" => Ok(Family::Watchos),
            other => Err(PlatformError::UnsupportedFamily(other.to_string())),
        }
    }
}

/// Device or simulator sub-target within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Physical device target
    Device,
    /// Simulator target
    Simulator,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Device => write!(f, "device"),
            Variant::Simulator => write!(f, "simulator"),
        }
    }
}

/// One concrete, buildable target: a (family, variant) pair plus the
/// canonical names the toolchain and the cache key need.
///
/// `sdk_name` participates in fingerprints; `display_name` and
/// `destination_spec` never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformIdentity {
    /// Originating family
    pub family: Family,
    /// Device or simulator
    pub variant: Variant,
    /// Canonical SDK short name (e.g. "iphoneos")
    pub sdk_name: &'static str,
    /// Human-readable label, not used in any key derivation
    pub display_name: &'static str,
    /// Destination string consumed by the external toolchain
    pub destination_spec: &'static str,
}

impl PlatformIdentity {
    /// Identity table for a (family, variant) pair.
    ///
    /// Returns `None` for the variants that do not exist (simulator on
    /// macOS and Mac Catalyst).
    pub fn resolve(family: Family, variant: Variant) -> Option<PlatformIdentity> {
        let (sdk_name, display_name, destination_spec) = match (family, variant) {
            (Family::MacOs, Variant::Device) => {
                ("macos", "macOS", "generic/platform=macOS,name=Any Mac")
            }
            (Family::MacCatalyst, Variant::Device) => (
                "maccatalyst",
                "Catalyst",
                "generic/platform=macOS,variant=Mac Catalyst",
            ),
            (Family::Ios, Variant::Device) => ("iphoneos", "iOS", "generic/platform=iOS"),
            (Family::Ios, Variant::Simulator) => (
                "iphonesimulator",
                "iPhone Simulator",
                "generic/platform=iOS Simulator",
            ),
            (Family::Tvos, Variant::Device) => ("appletvos", "tvOS", "generic/platform=tvOS"),
            (Family::Tvos, Variant::Simulator) => (
                "appletvsimulator",
                "TV Simulator",
                "generic/platform=tvOS Simulator",
            ),
            (Family::Watchos, Variant::Device) => {
                ("watchos", "watchOS", "generic/platform=watchOS")
            }
            (Family::Watchos, Variant::Simulator) => (
                "watchsimulator",
                "Watch Simulator",
                "generic/platform=watchOS Simulator",
            ),
            (Family::MacOs, Variant::Simulator) | (Family::MacCatalyst, Variant::Simulator) => {
                return None
            }
        };
        Some(PlatformIdentity {
            family,
            variant,
            sdk_name,
            display_name,
            destination_spec,
        })
    }
}

/// Expand a family into its buildable identities, device before simulator.
///
/// Pure and total over the closed family set. When `simulator_support` is
/// false, or the family has no simulator variant, only the device identity
/// is returned.
pub fn identities_for(family: Family, simulator_support: bool) -> Vec<PlatformIdentity> {
    let mut identities = Vec::with_capacity(2);
    if let Some(device) = PlatformIdentity::resolve(family, Variant::Device) {
        identities.push(device);
    }
    if simulator_support {
        if let Some(simulator) = PlatformIdentity::resolve(family, Variant::Simulator) {
            identities.push(simulator);
        }
    }
    identities
}
