/*!
 * Run Registry
 * Single source of truth for what is currently running
 *
 * Every entry owns its admission permit, its timeout guard and the kill
 * channel to its tracker, so removing an entry is what frees the slot and
 * disarms the timer. Removal is the one
 * terminal transition of a run: whichever path removes the entry first (the
 * lifecycle tracker or a forced kill) owns the settlement.
 */

use super::lifecycle::KillSender;
use super::timeout::TimeoutGuard;
use crate::core::types::{ActiveRunInfo, Pid, RunId};
use crate::signals::KillSignal;
use ahash::RandomState;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{Notify, OwnedSemaphorePermit};

/// One in-flight OS process
#[derive(Debug)]
pub(crate) struct ActiveRun {
    pub pid: Pid,
    pub started: Instant,
    pub command: String,
    pub args: Vec<String>,
    kill: KillSender,
    timeout: Option<TimeoutGuard>,
    _permit: OwnedSemaphorePermit,
}

impl ActiveRun {
    pub fn new(
        pid: Pid,
        started: Instant,
        command: String,
        args: Vec<String>,
        kill: KillSender,
        timeout: Option<TimeoutGuard>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            pid,
            started,
            command,
            args,
            kill,
            timeout,
            _permit: permit,
        }
    }

    #[inline]
    pub fn has_timeout(&self) -> bool {
        self.timeout.is_some()
    }

    /// Ask the run's tracker to deliver `signal`
    ///
    /// Returns `false` once the tracker has seen the process exit.
    pub fn signal(&self, signal: KillSignal) -> bool {
        self.kill.send(signal).is_ok()
    }

    fn info(&self, run_id: RunId) -> ActiveRunInfo {
        ActiveRunInfo {
            run_id,
            pid: self.pid,
            command: self.command.clone(),
            args: self.args.clone(),
            elapsed: self.started.elapsed(),
        }
    }
}

type RunMap = HashMap<RunId, ActiveRun, RandomState>;

/// Owned map of run ID to active run
pub(crate) struct Registry {
    runs: Mutex<RunMap>,
    next_id: AtomicU64,
    drained: Notify,
}

/// Exclusive access used to make admit-spawn-insert one step
pub(crate) struct RegistryGuard<'a> {
    runs: MutexGuard<'a, RunMap>,
}

impl RegistryGuard<'_> {
    /// Insert a run and return the registry size afterwards
    pub fn insert(&mut self, run_id: RunId, run: ActiveRun) -> usize {
        self.runs.insert(run_id, run);
        self.runs.len()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::with_hasher(RandomState::new())),
            next_id: AtomicU64::new(1),
            drained: Notify::new(),
        }
    }

    #[inline]
    pub fn next_run_id(&self) -> RunId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            runs: self.runs.lock(),
        }
    }

    /// Remove a run; only the first caller for a given ID gets it back
    pub fn settle(&self, run_id: RunId) -> Option<ActiveRun> {
        let (run, now_empty) = {
            let mut runs = self.runs.lock();
            let run = runs.remove(&run_id);
            (run, runs.is_empty())
        };
        if run.is_some() && now_empty {
            self.drained.notify_waiters();
        }
        run
    }

    /// Remove every run at once
    pub fn drain(&self) -> Vec<(RunId, ActiveRun)> {
        let drained: Vec<_> = self.runs.lock().drain().collect();
        if !drained.is_empty() {
            self.drained.notify_waiters();
        }
        drained
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.lock().is_empty()
    }

    /// Send `signal` to every active run; returns how many trackers took it
    pub fn signal_all(&self, signal: KillSignal) -> usize {
        self.runs
            .lock()
            .values()
            .filter(|run| run.signal(signal))
            .count()
    }

    /// Copies of the active runs, ordered by run ID
    pub fn snapshot(&self) -> Vec<ActiveRunInfo> {
        let mut infos: Vec<_> = self
            .runs
            .lock()
            .iter()
            .map(|(id, run)| run.info(*id))
            .collect();
        infos.sort_unstable_by_key(|info| info.run_id);
        infos
    }

    /// Resolves once the registry is empty
    pub async fn wait_empty(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
