//! Cache-aware build orchestration.
//!
//! Drives each build unit through its lifecycle: consult the cache, skip
//! on a materialized hit, otherwise invoke the external executor and
//! record the result back into the cache. Units are independent work;
//! a failed unit never aborts its siblings, and the aggregated report
//! always covers every requested unit.
//!
//! Execution is sequential by default. An explicit concurrency bound opts
//! into a worker pool; a per-fingerprint gate then guarantees at most one
//! build per key is in flight, with duplicate-key units reusing the first
//! outcome instead of rebuilding.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::cache::CacheStore;
use crate::cancel::CancelToken;
use crate::executor::BuildExecutor;
use crate::matrix::{self, BuildUnit, ExpandError};
use crate::options::{BuildOptions, PackageIdentity};
use crate::report::{FailureKind, RunReport, SkipReason, UnitReport};
use crate::state::{UnitProgress, UnitState};

/// Terminal disposition of one unit, shared between duplicate-key units
#[derive(Debug, Clone)]
struct Disposition {
    status: UnitState,
    skip_reason: Option<SkipReason>,
    failure_kind: Option<FailureKind>,
    diagnostics: Option<String>,
}

/// Per-fingerprint in-flight coordination.
///
/// Each fingerprint gets one slot; a worker holds the slot's lock for the
/// duration of processing, so a second unit with the same key waits and
/// then reuses the recorded outcome. Distinct keys never contend.
#[derive(Default)]
struct KeyGate {
    slots: Mutex<HashMap<String, Arc<Mutex<Option<Disposition>>>>>,
}

impl KeyGate {
    fn slot(&self, key: &str) -> Arc<Mutex<Option<Disposition>>> {
        let mut slots = self.slots.lock().unwrap();
        slots.entry(key.to_string()).or_default().clone()
    }
}

/// The top-level driver
pub struct Orchestrator {
    executor: Arc<dyn BuildExecutor>,
    cache: Arc<dyn CacheStore>,
    concurrency: usize,
    cancel: CancelToken,
}

impl Orchestrator {
    /// Create a sequential orchestrator over the given collaborators
    pub fn new(executor: Arc<dyn BuildExecutor>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            executor,
            cache,
            concurrency: 1,
            cancel: CancelToken::new(),
        }
    }

    /// Set the maximum number of units processed concurrently.
    ///
    /// The external toolchain is usually the scarce resource; values
    /// above 1 are an explicit opt-in. Zero is clamped to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Use an externally controlled cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Expand the request and drive every unit to a terminal state.
    ///
    /// Structural errors (empty platform set, fingerprint derivation)
    /// surface here, before any work starts. Per-unit errors never do;
    /// they are captured in the report.
    pub fn run(
        &self,
        package: &PackageIdentity,
        options: &BuildOptions,
        output_dir: &Path,
    ) -> Result<RunReport, ExpandError> {
        let started = Instant::now();
        let run_id = matrix::generate_run_id();
        let units = matrix::expand(package, options)?;

        eprintln!(
            "Preparing {}: {} build unit(s), concurrency {}",
            package,
            units.len(),
            self.concurrency
        );

        let reports = if self.concurrency == 1 {
            self.run_sequential(&units, output_dir)
        } else {
            self.run_concurrent(&units, output_dir)
        };

        Ok(RunReport::from_units(
            run_id,
            package.to_string(),
            reports,
            started.elapsed().as_millis() as u64,
            self.cancel.is_cancelled(),
        ))
    }

    fn run_sequential(&self, units: &[BuildUnit], output_dir: &Path) -> Vec<UnitReport> {
        let gate = KeyGate::default();
        units
            .iter()
            .map(|unit| self.drive_unit(unit, output_dir, &gate))
            .collect()
    }

    fn run_concurrent(&self, units: &[BuildUnit], output_dir: &Path) -> Vec<UnitReport> {
        let gate = KeyGate::default();
        let queue: Mutex<VecDeque<usize>> = Mutex::new((0..units.len()).collect());
        let results: Mutex<Vec<Option<UnitReport>>> = Mutex::new(vec![None; units.len()]);

        std::thread::scope(|scope| {
            for _ in 0..self.concurrency.min(units.len()) {
                scope.spawn(|| loop {
                    let index = match self.next_index(&queue) {
                        Some(index) => index,
                        None => break,
                    };
                    let report = self.drive_unit(&units[index], output_dir, &gate);
                    results.lock().unwrap()[index] = Some(report);
                });
            }
        });

        // Every index was claimed exactly once, so every slot is filled.
        results
            .into_inner()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    fn next_index(&self, queue: &Mutex<VecDeque<usize>>) -> Option<usize> {
        queue.lock().unwrap().pop_front()
    }

    /// Process one unit, honoring the per-key gate
    fn drive_unit(&self, unit: &BuildUnit, output_dir: &Path, gate: &KeyGate) -> UnitReport {
        let started = Instant::now();
        let slot = gate.slot(&unit.fingerprint);
        let mut outcome = slot.lock().unwrap();

        let disposition = match outcome.as_ref() {
            // A sibling with the same fingerprint already finished; reuse
            // its result instead of rebuilding.
            Some(prior) => prior.clone(),
            None => {
                let disposition = self.process_unit(unit, output_dir);
                *outcome = Some(disposition.clone());
                disposition
            }
        };
        drop(outcome);

        UnitReport {
            unit_id: unit.id.clone(),
            family: unit.platform.family,
            variant: unit.platform.variant,
            sdk_name: unit.platform.sdk_name.to_string(),
            fingerprint: unit.fingerprint.clone(),
            status: disposition.status,
            skip_reason: disposition.skip_reason,
            failure_kind: disposition.failure_kind,
            diagnostics: disposition.diagnostics,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// The cache-check → build → store sequence for one unit
    fn process_unit(&self, unit: &BuildUnit, output_dir: &Path) -> Disposition {
        let mut progress = UnitProgress::new();
        let sdk = unit.platform.sdk_name;
        let unit_out = unit_output_dir(output_dir, unit);

        if self.cancel.is_cancelled() {
            advance(&mut progress, UnitState::Skipped);
            return Disposition {
                status: UnitState::Skipped,
                skip_reason: Some(SkipReason::NotAttempted),
                failure_kind: None,
                diagnostics: None,
            };
        }

        advance(&mut progress, UnitState::CacheChecking);
        match self.cache.lookup(&unit.fingerprint) {
            Ok(Some(artifact)) => match self.cache.materialize(&artifact, &unit_out) {
                Ok(()) => {
                    eprintln!("  [{}] restored from cache", sdk);
                    advance(&mut progress, UnitState::Skipped);
                    return Disposition {
                        status: UnitState::Skipped,
                        skip_reason: Some(SkipReason::CacheHit),
                        failure_kind: None,
                        diagnostics: None,
                    };
                }
                Err(e) => {
                    // A corrupt or unreachable entry is a miss, not fatal.
                    eprintln!("  [{}] cache entry unusable, rebuilding: {}", sdk, e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                eprintln!("  [{}] cache lookup failed, treating as miss: {}", sdk, e);
            }
        }

        advance(&mut progress, UnitState::Building);
        eprintln!("  [{}] building...", sdk);
        let products = match self
            .executor
            .execute(&unit.package, &unit.platform, &unit.options, &unit_out)
        {
            Ok(products) => products,
            Err(failure) => {
                advance(&mut progress, UnitState::Failed);
                let kind = if self.cancel.is_cancelled() {
                    FailureKind::Cancelled
                } else {
                    FailureKind::BuildFailed
                };
                eprintln!("  [{}] build failed", sdk);
                return Disposition {
                    status: UnitState::Failed,
                    skip_reason: None,
                    failure_kind: Some(kind),
                    diagnostics: Some(failure.diagnostics),
                };
            }
        };

        match self.cache.store(&unit.fingerprint, &products.artifact_dir) {
            Ok(()) => {
                advance(&mut progress, UnitState::Cached);
                Disposition {
                    status: UnitState::Cached,
                    skip_reason: None,
                    failure_kind: None,
                    diagnostics: None,
                }
            }
            Err(e) => {
                // The artifact exists for this run; only reuse is lost.
                eprintln!("  [{}] built, but storing in cache failed: {}", sdk, e);
                advance(&mut progress, UnitState::Built);
                Disposition {
                    status: UnitState::Built,
                    skip_reason: None,
                    failure_kind: None,
                    diagnostics: None,
                }
            }
        }
    }
}

/// Per-unit output location under the run's output directory
pub fn unit_output_dir(output_dir: &Path, unit: &BuildUnit) -> PathBuf {
    output_dir.join(unit.platform.sdk_name)
}

fn advance(progress: &mut UnitProgress, target: UnitState) {
    progress
        .transition(target)
        .expect("unit lifecycle edges are fixed at compile time");
}
