/*!
 * Shutdown Coordination
 *
 * Graceful-then-forced termination of all in-flight runs:
 * 1. Close admission (no new runs from this point on)
 * 2. Send the kill signal to every active run
 * 3. Race natural settlement against the deadline
 * 4. Force-kill survivors if the deadline wins
 *
 * Shutdown is started at most once per pool. Every caller receives a clone of
 * the same shared future.
 */

use super::registry::Registry;
use crate::monitoring::AtomicPoolMetrics;
use crate::signals::KillSignal;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Summary of a finished shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ShutdownReport {
    /// Runs that received the graceful kill signal
    pub signaled: usize,
    /// Runs still alive at the deadline and force-killed
    pub force_killed: usize,
    #[serde(with = "crate::core::serde::millis")]
    pub elapsed: Duration,
}

/// Handle to an in-flight or finished shutdown; await it for the report
pub type ShutdownHandle = Shared<BoxFuture<'static, ShutdownReport>>;

/// Holds the one shutdown operation of a pool
pub(crate) struct ShutdownCoordinator {
    handle: Mutex<Option<ShutdownHandle>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Return the existing operation, or start one with `start`
    ///
    /// `start` runs at most once, under the coordinator lock.
    pub fn begin<F>(&self, start: F) -> ShutdownHandle
    where
        F: FnOnce() -> BoxFuture<'static, ShutdownReport>,
    {
        let mut slot = self.handle.lock();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let handle = start().shared();
        *slot = Some(handle.clone());
        handle
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.handle.lock().is_some()
    }
}

/// Signal all active runs, wait for them to settle, force-kill on deadline
pub(crate) async fn drain(
    registry: &Registry,
    metrics: &AtomicPoolMetrics,
    signal: KillSignal,
    timeout: Duration,
) -> ShutdownReport {
    let started = Instant::now();

    info!(
        active = registry.len(),
        signal = %signal,
        timeout_ms = timeout.as_millis() as u64,
        "Pool shutdown started"
    );

    let signaled = registry.signal_all(signal);

    let force_killed = match tokio::time::timeout(timeout, registry.wait_empty()).await {
        Ok(()) => 0,
        Err(_) => {
            warn!(
                remaining = registry.len(),
                "Shutdown deadline reached; force-killing survivors"
            );
            force_kill_all(registry, metrics)
        }
    };

    let report = ShutdownReport {
        signaled,
        force_killed,
        elapsed: started.elapsed(),
    };
    info!(
        signaled = report.signaled,
        force_killed = report.force_killed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Pool shutdown complete"
    );
    report
}

/// SIGKILL every tracked process and clear the registry immediately
///
/// Does not wait for the OS to confirm termination. Each tracker delivers the
/// kill to its own child. Removed runs are counted as terminated; their
/// trackers see the entry gone and record nothing further.
pub(crate) fn force_kill_all(registry: &Registry, metrics: &AtomicPoolMetrics) -> usize {
    let drained = registry.drain();
    let count = drained.len();

    for (run_id, run) in drained {
        run.signal(KillSignal::KILL);
        warn!(
            run_id,
            pid = run.pid,
            command = %run.command,
            elapsed_ms = run.started.elapsed().as_millis() as u64,
            "Force-killed run"
        );
        // `run` drops here: timer disarmed, slot released
    }

    metrics.record_terminated(count);
    count
}
