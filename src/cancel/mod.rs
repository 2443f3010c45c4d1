//! Run cancellation.
//!
//! A `CancelToken` is shared between the signal handler and the
//! orchestrator's workers. Once fired it never resets: in-flight units
//! finish as FAILED with a Cancelled cause, and units not yet started are
//! reported SKIPPED with a NotAttempted cause rather than silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one run
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Wire SIGINT/SIGTERM to the token.
///
/// The first signal requests graceful cancellation; the run then drains
/// in-flight units and reports. A second signal exits immediately.
pub fn install_signal_handler(token: CancelToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            eprintln!("\nReceived second interrupt, exiting immediately...");
            std::process::exit(crate::report::ExitCode::Cancelled.as_i32());
        }
        eprintln!("\nReceived interrupt, finishing in-flight units...");
        token.cancel();
    })
}
