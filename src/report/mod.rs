//! Run and unit reports.
//!
//! Every requested unit appears in the report with its terminal status;
//! partial success is representable and distinguishable from total success
//! or total failure. The process exit code derives from the aggregate,
//! never from the first error encountered.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::{Family, Variant};
use crate::state::UnitState;

/// Schema version for run reports
pub const RUN_REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for run reports
pub const RUN_REPORT_SCHEMA_ID: &str = "xcf-forge/run_report@1";

/// Why a unit was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Cache hit, artifact materialized from a prior run
    CacheHit,
    /// Run was cancelled before the unit started
    NotAttempted,
}

/// Why a unit failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The external build collaborator reported an error
    BuildFailed,
    /// The run was cancelled while this unit was in flight
    Cancelled,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every unit reached a terminal success state
    Success,
    /// At least one unit failed
    Failed,
    /// The run was cancelled
    Cancelled,
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// All units terminal-success
    Success,
    /// At least one unit failed to build
    BuildFailed,
    /// Run cancelled
    Cancelled,
}

impl ExitCode {
    /// Numeric exit code
    pub fn as_i32(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::BuildFailed => 70,
            ExitCode::Cancelled => 80,
        }
    }
}

/// Terminal record for one build unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit identifier
    pub unit_id: String,
    /// Platform family
    pub family: Family,
    /// Device or simulator
    pub variant: Variant,
    /// Canonical SDK name
    pub sdk_name: String,
    /// Cache fingerprint
    pub fingerprint: String,
    /// Terminal state
    pub status: UnitState,
    /// Why the unit was skipped (when status is SKIPPED)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Why the unit failed (when status is FAILED)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Toolchain diagnostics for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    /// Wall-clock duration of the unit in milliseconds
    pub duration_ms: u64,
}

/// Aggregated result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub schema_version: u32,
    /// Schema identifier
    pub schema_id: String,
    /// Run identifier
    pub run_id: String,
    /// Package built, as `name@revision`
    pub package: String,
    /// When the report was created
    pub created_at: DateTime<Utc>,
    /// Overall status
    pub status: RunStatus,
    /// Stable exit code
    pub exit_code: i32,
    /// Total units in the run
    pub unit_count: usize,
    /// Units served from cache
    pub units_skipped: usize,
    /// Units built and stored
    pub units_cached: usize,
    /// Units built but not stored (store failure)
    pub units_built: usize,
    /// Units failed
    pub units_failed: usize,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Human-readable summary line
    pub human_summary: String,
    /// Per-unit terminal records, in expansion order
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Aggregate unit reports into a run report.
    ///
    /// `cancelled` marks runs interrupted by signal or timeout; it forces
    /// the overall status and exit code even when no unit reached FAILED.
    pub fn from_units(
        run_id: String,
        package: String,
        units: Vec<UnitReport>,
        duration_ms: u64,
        cancelled: bool,
    ) -> Self {
        let mut units_skipped = 0;
        let mut units_cached = 0;
        let mut units_built = 0;
        let mut units_failed = 0;

        for unit in &units {
            match unit.status {
                UnitState::Skipped => units_skipped += 1,
                UnitState::Cached => units_cached += 1,
                UnitState::Built => units_built += 1,
                UnitState::Failed => units_failed += 1,
                // Non-terminal states never reach the report.
                _ => {}
            }
        }

        let status = if cancelled {
            RunStatus::Cancelled
        } else if units_failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        let exit_code = match status {
            RunStatus::Success => ExitCode::Success,
            RunStatus::Failed => ExitCode::BuildFailed,
            RunStatus::Cancelled => ExitCode::Cancelled,
        };

        let human_summary = Self::generate_human_summary(
            status,
            units.len(),
            units_skipped,
            units_cached,
            units_built,
            units_failed,
        );

        Self {
            schema_version: RUN_REPORT_SCHEMA_VERSION,
            schema_id: RUN_REPORT_SCHEMA_ID.to_string(),
            run_id,
            package,
            created_at: Utc::now(),
            status,
            exit_code: exit_code.as_i32(),
            unit_count: units.len(),
            units_skipped,
            units_cached,
            units_built,
            units_failed,
            duration_ms,
            human_summary,
            units,
        }
    }

    fn generate_human_summary(
        status: RunStatus,
        count: usize,
        skipped: usize,
        cached: usize,
        built: usize,
        failed: usize,
    ) -> String {
        match status {
            RunStatus::Success if skipped == count => {
                format!("All {} unit(s) restored from cache", count)
            }
            RunStatus::Success => format!(
                "{} unit(s) completed: {} cached, {} built, {} skipped",
                count, cached, built, skipped
            ),
            RunStatus::Failed => format!(
                "{} of {} unit(s) failed ({} cached, {} built, {} skipped)",
                failed, count, cached, built, skipped
            ),
            RunStatus::Cancelled => format!(
                "Run cancelled: {} of {} unit(s) finished",
                skipped + cached + built,
                count
            ),
        }
    }

    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_unit(status: UnitState, sdk_name: &str) -> UnitReport {
        UnitReport {
            unit_id: format!("unit-{}", sdk_name),
            family: Family::Ios,
            variant: Variant::Device,
            sdk_name: sdk_name.to_string(),
            fingerprint: "f".repeat(64),
            status,
            skip_reason: None,
            failure_kind: None,
            diagnostics: None,
            duration_ms: 10,
        }
    }

    #[test]
    fn test_all_success_gives_exit_zero() {
        let report = RunReport::from_units(
            "run-1".to_string(),
            "MyLib@abc".to_string(),
            vec![
                make_unit(UnitState::Cached, "iphoneos"),
                make_unit(UnitState::Skipped, "macos"),
                make_unit(UnitState::Built, "appletvos"),
            ],
            100,
            false,
        );
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.units_cached, 1);
        assert_eq!(report.units_skipped, 1);
        assert_eq!(report.units_built, 1);
    }

    #[test]
    fn test_single_failure_fails_the_run() {
        let report = RunReport::from_units(
            "run-1".to_string(),
            "MyLib@abc".to_string(),
            vec![
                make_unit(UnitState::Failed, "appletvos"),
                make_unit(UnitState::Built, "macos"),
            ],
            100,
            false,
        );
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.exit_code, ExitCode::BuildFailed.as_i32());
        // The sibling's success stays visible alongside the failure.
        assert_eq!(report.units_built, 1);
        assert_eq!(report.units_failed, 1);
    }

    #[test]
    fn test_cancelled_run_overrides_status() {
        let report = RunReport::from_units(
            "run-1".to_string(),
            "MyLib@abc".to_string(),
            vec![
                make_unit(UnitState::Cached, "iphoneos"),
                make_unit(UnitState::Skipped, "macos"),
            ],
            100,
            true,
        );
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.exit_code, 80);
    }

    #[test]
    fn test_built_and_cached_are_distinct_in_report() {
        let report = RunReport::from_units(
            "run-1".to_string(),
            "MyLib@abc".to_string(),
            vec![
                make_unit(UnitState::Built, "iphoneos"),
                make_unit(UnitState::Cached, "macos"),
            ],
            100,
            false,
        );
        assert_eq!(report.units_built, 1);
        assert_eq!(report.units_cached, 1);
    }

    #[test]
    fn test_report_serialization_round_trip() {
        let mut unit = make_unit(UnitState::Failed, "iphoneos");
        unit.failure_kind = Some(FailureKind::BuildFailed);
        unit.diagnostics = Some("error: no such module".to_string());

        let report = RunReport::from_units(
            "run-1".to_string(),
            "MyLib@abc".to_string(),
            vec![unit],
            100,
            false,
        );

        let json = report.to_json().unwrap();
        assert!(json.contains("\"schema_id\": \"xcf-forge/run_report@1\""));
        assert!(json.contains("\"BUILD_FAILED\""));

        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.units.len(), 1);
        assert_eq!(parsed.units[0].failure_kind, Some(FailureKind::BuildFailed));
    }

    #[test]
    fn test_exit_codes_are_stable() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::BuildFailed.as_i32(), 70);
        assert_eq!(ExitCode::Cancelled.as_i32(), 80);
    }
}
