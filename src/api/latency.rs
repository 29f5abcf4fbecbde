//! Wall time of refresh cycles, one sample per tracker tick.
//!
//! A cycle spans the outbound request, the body read and every extraction
//! strategy tried on it, so the tail is dominated by slow or timed-out fetches.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;

/// Longest cycle kept at full precision; the fetch timeouts are far below it.
const MAX_CYCLE_MS: u64 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePercentiles {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

/// Shared by every tracker; the /stats/latency handler reads it.
pub struct LatencyStats {
    cycles: Mutex<Histogram<u64>>,
}

impl LatencyStats {
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, MAX_CYCLE_MS, 3).expect("valid histogram bounds");
        Self { cycles: Mutex::new(histogram) }
    }

    /// Sub-millisecond cycles count as 1ms; anything past `MAX_CYCLE_MS` is clamped.
    pub fn record(&self, cycle: Duration) {
        let ms = u64::try_from(cycle.as_millis()).unwrap_or(u64::MAX).max(1);
        if let Ok(mut h) = self.cycles.lock() {
            h.saturating_record(ms);
        }
    }

    /// Sample count and, once there is at least one sample, p50/p95/p99.
    pub fn snapshot(&self) -> (u64, Option<CyclePercentiles>) {
        let Ok(h) = self.cycles.lock() else {
            return (0, None);
        };
        let percentiles = (!h.is_empty()).then(|| CyclePercentiles {
            p50_ms: h.value_at_quantile(0.5),
            p95_ms: h.value_at_quantile(0.95),
            p99_ms: h.value_at_quantile(0.99),
        });
        (h.len(), percentiles)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
