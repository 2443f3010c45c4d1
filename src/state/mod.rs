//! Build-unit state machine.
//!
//! Unit states: Pending → CacheChecking → {Skipped | Building}
//! → {Cached | Built | Failed}. `Built` is a terminal success distinct
//! from `Cached`: the artifact was produced but storing it failed, so a
//! future run cannot reuse it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one build unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    /// Not yet started
    Pending,
    /// Consulting the cache backend
    CacheChecking,
    /// External build in progress
    Building,
    /// Terminal: not built in this run (cache hit, or never attempted)
    Skipped,
    /// Terminal: built and stored; reusable by future runs
    Cached,
    /// Terminal: built but not stored; usable for this run only
    Built,
    /// Terminal: build failed or was cancelled
    Failed,
}

impl UnitState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitState::Skipped | UnitState::Cached | UnitState::Built | UnitState::Failed
        )
    }

    /// Check if this terminal state counts as success
    pub fn is_success(&self) -> bool {
        matches!(self, UnitState::Skipped | UnitState::Cached | UnitState::Built)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: UnitState) -> bool {
        match (self, target) {
            // From PENDING
            (UnitState::Pending, UnitState::CacheChecking) => true,
            // Run cancelled before the unit started
            (UnitState::Pending, UnitState::Skipped) => true,

            // From CACHE_CHECKING
            // Hit + successful materialize
            (UnitState::CacheChecking, UnitState::Skipped) => true,
            // Miss, lookup error, or failed materialize
            (UnitState::CacheChecking, UnitState::Building) => true,

            // From BUILDING
            (UnitState::Building, UnitState::Cached) => true,
            (UnitState::Building, UnitState::Built) => true,
            (UnitState::Building, UnitState::Failed) => true,

            // Terminal states accept no transitions
            _ => false,
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitState::Pending => "PENDING",
            UnitState::CacheChecking => "CACHE_CHECKING",
            UnitState::Building => "BUILDING",
            UnitState::Skipped => "SKIPPED",
            UnitState::Cached => "CACHED",
            UnitState::Built => "BUILT",
            UnitState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Errors for unit state transitions
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: UnitState, to: UnitState },
}

/// Mutable state tracker for one unit during a run
#[derive(Debug, Clone)]
pub struct UnitProgress {
    state: UnitState,
}

impl UnitProgress {
    /// Start in `Pending`
    pub fn new() -> Self {
        Self {
            state: UnitState::Pending,
        }
    }

    /// Current state
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Transition to a new state, rejecting invalid edges
    pub fn transition(&mut self, target: UnitState) -> Result<(), StateError> {
        if !self.state.can_transition_to(target) {
            return Err(StateError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }
}

impl Default for UnitProgress {
    fn default() -> Self {
        Self::new()
    }
}
