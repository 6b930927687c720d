// Long-lived behavior routines
//
// A routine is a cooperatively scheduled task gated by an enable flag. It
// try-acquires the subsystems it needs; while it holds their tokens it is
// responsible for driving both the sampling and the control phase itself,
// and the periodic updater skips those subsystems. Releasing the tokens
// hands responsibility back.

pub mod deposit;
pub mod pull_out;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

/// Handle to a spawned behavior routine.
///
/// There is no preemptive cancellation: `disable` clears the flag and the
/// routine winds down at its next tick, releasing its ownership tokens on
/// the way out. `abort` is for process shutdown only.
pub struct Routine {
    enabled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Routine {
    pub(crate) fn new(enabled: Arc<AtomicBool>, handle: JoinHandle<()>) -> Self {
        Self { enabled, handle }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Routines may also disable themselves when their exit condition hits
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Tear the task down entirely (shutdown path)
    pub fn abort(&self) {
        self.handle.abort();
    }
}
