//! Partial-failure and cancellation semantics.

use std::sync::Arc;

use tempfile::TempDir;

use xcf_forge::mock::{MemoryCache, MockExecutor};
use xcf_forge::options::BuildConfiguration;
use xcf_forge::report::{FailureKind, RunStatus, SkipReason};
use xcf_forge::{BuildOptions, CancelToken, Family, Orchestrator, PackageIdentity, UnitState};

fn make_package() -> PackageIdentity {
    PackageIdentity::new("MyLib", "a1b2c3d")
}

#[test]
fn test_one_failed_unit_does_not_stop_siblings() {
    let temp = TempDir::new().unwrap();
    let executor = Arc::new(MockExecutor::new().fail_sdk("appletvos", "error: link failed"));
    let cache = Arc::new(MemoryCache::new());

    let options = BuildOptions::new(
        BuildConfiguration::Release,
        [Family::Tvos, Family::MacOs, Family::Ios],
    );
    let report = Orchestrator::new(executor.clone(), cache)
        .run(&make_package(), &options, temp.path())
        .unwrap();

    // All three units were attempted despite the tvOS failure.
    assert_eq!(executor.total_builds(), 3);
    assert_eq!(report.unit_count, 3);
    assert_eq!(report.units_failed, 1);
    assert_eq!(report.units_cached, 2);

    assert_eq!(report.status, RunStatus::Failed);
    assert_ne!(report.exit_code, 0);

    let tvos = report
        .units
        .iter()
        .find(|u| u.sdk_name == "appletvos")
        .unwrap();
    assert_eq!(tvos.status, UnitState::Failed);
    assert_eq!(tvos.failure_kind, Some(FailureKind::BuildFailed));
    assert_eq!(tvos.diagnostics.as_deref(), Some("error: link failed"));

    let macos = report.units.iter().find(|u| u.sdk_name == "macos").unwrap();
    assert_eq!(macos.status, UnitState::Cached);
}

#[test]
fn test_failed_unit_is_not_stored_in_cache() {
    let temp = TempDir::new().unwrap();
    let executor = Arc::new(MockExecutor::new().fail_sdk("iphoneos", "boom"));
    let cache = Arc::new(MemoryCache::new());

    let options = BuildOptions::new(BuildConfiguration::Release, [Family::Ios]);
    Orchestrator::new(executor, cache.clone())
        .run(&make_package(), &options, temp.path())
        .unwrap();

    assert_eq!(cache.store_count(), 0);
}

#[test]
fn test_cancellation_marks_in_flight_failed_and_rest_not_attempted() {
    let temp = TempDir::new().unwrap();
    let token = CancelToken::new();

    // The first unit's build observes the cancellation and fails; every
    // later unit must be reported, not dropped.
    let executor = Arc::new(
        MockExecutor::new()
            .fail_sdk("iphoneos", "interrupted")
            .cancel_during_build(token.clone()),
    );
    let cache = Arc::new(MemoryCache::new());

    let options = BuildOptions::new(
        BuildConfiguration::Release,
        [Family::Ios, Family::MacOs, Family::Tvos],
    );
    let report = Orchestrator::new(executor, cache)
        .with_cancel_token(token)
        .run(&make_package(), &options, temp.path())
        .unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.exit_code, 80);
    assert_eq!(report.unit_count, 3, "cancelled units stay in the report");

    let ios = report
        .units
        .iter()
        .find(|u| u.sdk_name == "iphoneos")
        .unwrap();
    assert_eq!(ios.status, UnitState::Failed);
    assert_eq!(ios.failure_kind, Some(FailureKind::Cancelled));

    for sdk in ["macos", "appletvos"] {
        let unit = report.units.iter().find(|u| u.sdk_name == sdk).unwrap();
        assert_eq!(unit.status, UnitState::Skipped);
        assert_eq!(unit.skip_reason, Some(SkipReason::NotAttempted));
    }
}

#[test]
fn test_pre_cancelled_run_attempts_nothing() {
    let temp = TempDir::new().unwrap();
    let token = CancelToken::new();
    token.cancel();

    let executor = Arc::new(MockExecutor::new());
    let cache = Arc::new(MemoryCache::new());

    let options = BuildOptions::new(BuildConfiguration::Release, [Family::Ios, Family::MacOs]);
    let report = Orchestrator::new(executor.clone(), cache.clone())
        .with_cancel_token(token)
        .run(&make_package(), &options, temp.path())
        .unwrap();

    assert_eq!(executor.total_builds(), 0);
    assert_eq!(cache.lookup_count(), 0, "no backend traffic after cancel");
    assert_eq!(report.units_skipped, 2);
    for unit in &report.units {
        assert_eq!(unit.skip_reason, Some(SkipReason::NotAttempted));
    }
}

#[test]
fn test_partial_success_is_distinguishable_in_report() {
    let temp = TempDir::new().unwrap();
    let executor = Arc::new(MockExecutor::new().fail_sdk("watchos", "no runtime"));
    let cache = Arc::new(MemoryCache::new());

    let options = BuildOptions::new(
        BuildConfiguration::Release,
        [Family::Watchos, Family::MacOs],
    );
    let report = Orchestrator::new(executor, cache)
        .run(&make_package(), &options, temp.path())
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.units_failed, 1);
    assert_eq!(report.units_cached, 1);
    assert!(report.human_summary.contains("1 of 2"));
}
