/*!
 * Run Lifecycle
 *
 * The tracker task owns the child. It waits for the process to exit and
 * settles the run exactly once: the registry entry is removed (which disarms
 * the timer and frees the slot), the duration is measured and the outcome is
 * classified before metrics are updated.
 *
 * Settlement follows process exit, not pipe EOF. Captured output is collected
 * afterwards; a descendant still holding a pipe gets `OUTPUT_DRAIN_GRACE`
 * before the bytes read so far are returned.
 *
 * Kill requests (timeout, shutdown, forced kill) arrive over a channel and
 * are delivered here, while the child is known to be unreaped, so a signal
 * never reaches a recycled PID.
 *
 * Outcome classes:
 * - exit with any code -> completed
 * - error while waiting on a launched child -> failed
 * - entry already removed by a forced kill -> counted as terminated there,
 *   nothing is recorded here
 */

use super::registry::Registry;
use crate::core::errors::{PoolError, PoolResult};
use crate::core::limits::OUTPUT_DRAIN_GRACE;
use crate::core::types::{exit_code_of, Pid, RunId, RunResult};
use crate::monitoring::AtomicPoolMetrics;
use crate::signals::{signal_or_warn, KillSignal};
use parking_lot::Mutex;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Requests a signal for one run; delivered by its tracker
pub(crate) type KillSender = mpsc::UnboundedSender<KillSignal>;
pub(crate) type KillReceiver = mpsc::UnboundedReceiver<KillSignal>;

pub(crate) fn kill_channel() -> (KillSender, KillReceiver) {
    mpsc::unbounded_channel()
}

/// What the tracker needs to know about a run it did not spawn itself
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    pub run_id: RunId,
    pub pid: Pid,
    pub command: String,
    pub args: Vec<String>,
    pub started: Instant,
    pub timed_out: Arc<AtomicBool>,
}

/// One captured pipe, read on its own task
struct OutputCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl OutputCapture {
    fn start<R>(pipe: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let reader = tokio::spawn(async move {
            let mut pipe = pipe;
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        debug!(error = %e, "Output pipe read failed");
                        break;
                    }
                }
            }
        });
        Self { buf, reader }
    }

    /// Wait up to `grace` for EOF, then take whatever was read
    async fn finish(self, grace: Duration) -> String {
        let Self { buf, mut reader } = self;
        if tokio::time::timeout(grace, &mut reader).await.is_err() {
            reader.abort();
            debug!(
                grace_ms = grace.as_millis() as u64,
                "Pipe still open after exit; keeping output read so far"
            );
        }
        let bytes = std::mem::take(&mut *buf.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

async fn collect(capture: Option<OutputCapture>, grace: Duration) -> Option<String> {
    match capture {
        Some(capture) => Some(capture.finish(grace).await),
        None => None,
    }
}

/// Wait for the child, deliver kill requests until it exits, then settle
pub(crate) async fn track(
    registry: &Registry,
    metrics: &AtomicPoolMetrics,
    ctx: RunContext,
    mut child: Child,
    mut kills: KillReceiver,
) -> PoolResult<RunResult> {
    let stdout = child.stdout.take().map(OutputCapture::start);
    let stderr = child.stderr.take().map(OutputCapture::start);

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(signal) = kills.recv() => {
                // `id()` is None once the child has been reaped
                if let Some(pid) = child.id() {
                    signal_or_warn(pid, signal);
                }
            }
        }
    };

    let settled = settle(registry, metrics, &ctx, status);
    let (stdout, stderr) = tokio::join!(
        collect(stdout, OUTPUT_DRAIN_GRACE),
        collect(stderr, OUTPUT_DRAIN_GRACE)
    );

    let mut result = settled?;
    result.stdout = stdout;
    result.stderr = stderr;
    Ok(result)
}

/// Terminal transition for one run
///
/// The returned result carries no output; the tracker attaches it.
pub(crate) fn settle(
    registry: &Registry,
    metrics: &AtomicPoolMetrics,
    ctx: &RunContext,
    status: io::Result<ExitStatus>,
) -> PoolResult<RunResult> {
    let duration = ctx.started.elapsed();

    // Dropping the entry disarms its timer and releases its slot
    let force_killed = registry.settle(ctx.run_id).is_none();
    let timed_out = ctx.timed_out.load(Ordering::SeqCst);

    match status {
        Ok(status) => {
            if !force_killed {
                metrics.record_completion(duration);
            }
            let (exit_code, signal) = exit_code_of(status);

            debug!(
                run_id = ctx.run_id,
                pid = ctx.pid,
                exit_code,
                duration_ms = duration.as_millis() as u64,
                timed_out,
                force_killed,
                "Run settled"
            );

            Ok(RunResult {
                exit_code,
                stdout: None,
                stderr: None,
                duration,
                pid: ctx.pid,
                command: ctx.command.clone(),
                args: ctx.args.clone(),
                signal,
                timed_out,
                force_killed,
            })
        }
        Err(source) => {
            if !force_killed {
                metrics.record_failure();
            }
            error!(run_id = ctx.run_id, pid = ctx.pid, error = %source, "Failed waiting on process");
            Err(PoolError::WaitFailed {
                pid: ctx.pid,
                source,
            })
        }
    }
}
