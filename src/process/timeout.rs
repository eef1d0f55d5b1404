/*!
 * Timeout Guard
 *
 * One-shot deadline timer per run. On expiry the configured kill signal is
 * requested exactly once; with a grace period configured, SIGKILL is
 * requested after the grace elapses. Requests go to the run's tracker, which
 * drops them once the process has exited. Dropping the guard disarms the
 * timer.
 */

use super::lifecycle::KillSender;
use crate::core::types::RunId;
use crate::signals::KillSignal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Armed deadline for one run
#[derive(Debug)]
pub(crate) struct TimeoutGuard {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl TimeoutGuard {
    /// Start the timer. Must be called within a Tokio runtime.
    pub fn arm(
        run_id: RunId,
        kill: KillSender,
        timeout: Duration,
        signal: KillSignal,
        grace: Option<Duration>,
    ) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            flag.store(true, Ordering::SeqCst);

            warn!(
                run_id,
                timeout_ms = timeout.as_millis() as u64,
                signal = %signal,
                "Run exceeded its timeout; sending kill signal"
            );
            if kill.send(signal).is_err() {
                return;
            }

            if let Some(grace) = grace {
                tokio::time::sleep(grace).await;
                if kill.send(KillSignal::KILL).is_ok() {
                    warn!(
                        run_id,
                        grace_ms = grace.as_millis() as u64,
                        "Run outlived its timeout signal; escalating to SIGKILL"
                    );
                }
            }
        });

        Self { handle, fired }
    }

    /// Flag that flips once the deadline has passed
    pub fn fired_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fired)
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            self.handle.abort();
            debug!("Timeout guard disarmed");
        }
    }
}
