/*!
 * Pool Metrics
 * Aggregate counters for admissions, completions and failures
 */

use crate::core::serde::is_zero_u64;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of the pool counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Metrics {
    /// Admitted runs, including those whose spawn failed
    pub total_executions: u64,
    pub active_processes: usize,
    /// Runs that launched and exited, whatever the exit code
    pub completed_processes: u64,
    /// Runs that could not be launched or waited on
    pub failed_processes: u64,
    /// Runs dropped from the registry by a forced kill
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub terminated_processes: u64,
    pub average_execution_time_ms: f64,
    /// Set once the registry has been full; never reset
    pub max_concurrent_reached: bool,
}

#[derive(Debug, Default)]
struct CompletionStats {
    completed: u64,
    average_ms: f64,
}

/// Lock-light metrics aggregator
///
/// # Performance
/// - Counters are relaxed atomics
/// - The completion count and running average share one short mutex so the
///   average is always taken over the count it was computed with
#[repr(C, align(64))]
pub struct AtomicPoolMetrics {
    enabled: bool,
    total: AtomicU64,
    failed: AtomicU64,
    terminated: AtomicU64,
    max_reached: AtomicBool,
    completion: Mutex<CompletionStats>,
}

impl AtomicPoolMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            terminated: AtomicU64::new(0),
            max_reached: AtomicBool::new(false),
            completion: Mutex::new(CompletionStats::default()),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A run was admitted; `active` is the registry size after it was added
    #[inline]
    pub fn record_start(&self, active: usize, max_concurrent: usize) {
        if !self.enabled {
            return;
        }
        self.total.fetch_add(1, Ordering::Relaxed);
        if active >= max_concurrent {
            self.max_reached.store(true, Ordering::Relaxed);
        }
    }

    /// Admitted run whose process never started
    #[inline]
    pub fn record_spawn_attempt(&self) {
        if self.enabled {
            self.total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// The process ran to exit, regardless of exit code
    pub fn record_completion(&self, duration: Duration) {
        if !self.enabled {
            return;
        }
        let sample = duration.as_secs_f64() * 1000.0;
        let mut stats = self.completion.lock();
        stats.completed += 1;
        let n = stats.completed as f64;
        stats.average_ms = (stats.average_ms * (n - 1.0) + sample) / n;
    }

    /// The process could not be launched or waited on
    #[inline]
    pub fn record_failure(&self) {
        if self.enabled {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Runs removed by a forced kill
    #[inline]
    pub fn record_terminated(&self, count: usize) {
        if self.enabled && count > 0 {
            self.terminated.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Copy the counters; `active` is the live registry size
    pub fn snapshot(&self, active: usize) -> Metrics {
        let (completed, average_ms) = {
            let stats = self.completion.lock();
            (stats.completed, stats.average_ms)
        };

        Metrics {
            total_executions: self.total.load(Ordering::Relaxed),
            active_processes: active,
            completed_processes: completed,
            failed_processes: self.failed.load(Ordering::Relaxed),
            terminated_processes: self.terminated.load(Ordering::Relaxed),
            average_execution_time_ms: average_ms,
            max_concurrent_reached: self.max_reached.load(Ordering::Relaxed),
        }
    }
}
