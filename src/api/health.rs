//! Shared health state for the /health endpoint.
//! Updated by every FundraiserTracker after each cycle.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cycle counters across all trackers. Trackers write, API reads.
#[derive(Default)]
pub struct HealthState {
    /// Cycles that produced a record.
    pub successes: AtomicU64,
    /// Cycles that ended in an UpdateError.
    pub failures: AtomicU64,
    /// Nanosecond timestamp of the most recent success (0 = none).
    pub last_success_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_ns: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.last_success_ns.fetch_max(at_ns, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn last_success_ns(&self) -> u64 {
        self.last_success_ns.load(Ordering::Relaxed)
    }
}
