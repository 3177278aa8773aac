//! Engine-wide request statistics: totals plus a rolling latency history.

use super::cache::CacheStats;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const LATENCY_HISTORY_CAPACITY: usize = 1000;

/// Thread-safe accumulator for request totals and recent latencies.
#[derive(Default)]
pub struct EngineStats {
    requests: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
    latency_history: Mutex<VecDeque<f64>>,
}

/// Point-in-time snapshot of [`EngineStats`], plus the cache's own stats.
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    pub requests: u64,
    pub success: u64,
    pub fail: u64,
    pub cache: CacheStats,
    pub recent_latencies_ms: Vec<f64>,
}

impl EngineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a completed request.
    pub fn record(&self, succeeded: bool, total_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fail.fetch_add(1, Ordering::Relaxed);
        }
        let mut history = self.latency_history.lock().expect("latency history lock poisoned");
        if history.len() >= LATENCY_HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(total_ms);
    }

    #[must_use]
    pub fn snapshot(&self, cache: CacheStats) -> PerformanceStats {
        let recent_latencies_ms = self
            .latency_history
            .lock()
            .expect("latency history lock poisoned")
            .iter()
            .copied()
            .collect();
        PerformanceStats {
            requests: self.requests.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            fail: self.fail.load(Ordering::Relaxed),
            cache,
            recent_latencies_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_success_and_failure_totals() {
        let stats = EngineStats::new();
        stats.record(true, 10.0);
        stats.record(false, 20.0);
        let snapshot = stats.snapshot(CacheStats::default());
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.fail, 1);
    }

    #[test]
    fn latency_history_evicts_from_front_when_full() {
        let stats = EngineStats::new();
        for i in 0..(LATENCY_HISTORY_CAPACITY + 10) {
            stats.record(true, i as f64);
        }
        let snapshot = stats.snapshot(CacheStats::default());
        assert_eq!(snapshot.recent_latencies_ms.len(), LATENCY_HISTORY_CAPACITY);
        // The oldest 10 entries (0..10) were evicted from the front.
        assert_eq!(snapshot.recent_latencies_ms[0], 10.0);
    }
}
