/*!
 * Process Pool
 *
 * Public entry point. Flow of one run:
 *
 * ```text
 * execute() -> AdmissionController (wait for slot)
 *           -> ProcessExecutor (spawn)  \ one step under the registry lock,
 *           -> Registry (register)      / re-checking the shutdown flag
 *           -> TimeoutGuard (arm)
 *           -> lifecycle::track (await exit, settle once, update metrics)
 *           -> RunResult
 * ```
 *
 * All shared state (registry, metrics, shutdown flag) lives in one `Arc`ed
 * inner value owned by the pool. Callers only ever get copies.
 */

use super::admission::AdmissionController;
use super::config::PoolConfig;
use super::executor::ProcessExecutor;
use super::lifecycle::{self, KillReceiver, RunContext};
use super::registry::{ActiveRun, Registry};
use super::shutdown::{self, ShutdownCoordinator, ShutdownHandle, ShutdownReport};
use super::timeout::TimeoutGuard;
use crate::core::errors::{PoolError, PoolResult};
use crate::core::limits::{DEFAULT_SHUTDOWN_TIMEOUT, HOST_SIGNAL_SHUTDOWN_TIMEOUT};
use crate::core::types::{ActiveRunInfo, ExecOptions, RunRequest, RunResult};
use crate::monitoring::{run_span, AtomicPoolMetrics, Metrics};
use crate::signals::{self, HostSignal};
use futures::future::{join_all, FutureExt};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

struct PoolInner {
    config: PoolConfig,
    admission: AdmissionController,
    registry: Registry,
    metrics: AtomicPoolMetrics,
    shutdown: ShutdownCoordinator,
}

/// Bounded-concurrency pool of external processes
///
/// Cloning is cheap and yields another handle to the same pool.
#[derive(Clone)]
pub struct ProcessPool {
    inner: Arc<PoolInner>,
}

impl ProcessPool {
    /// Create a pool
    ///
    /// With `handle_host_signals` set this must be called within a Tokio
    /// runtime; otherwise the watcher is skipped with a warning.
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        info!(
            max_concurrent = config.max_concurrent,
            default_timeout_ms = config.default_timeout.as_millis() as u64,
            kill_signal = %config.kill_signal,
            metrics_enabled = config.metrics_enabled,
            "Process pool initialized"
        );

        let pool = Self::from_valid(config);
        if pool.inner.config.handle_host_signals {
            pool.install_host_signal_watcher();
        }
        Ok(pool)
    }

    fn from_valid(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                admission: AdmissionController::new(config.max_concurrent),
                registry: Registry::new(),
                metrics: AtomicPoolMetrics::new(config.metrics_enabled),
                shutdown: ShutdownCoordinator::new(),
                config,
            }),
        }
    }

    /// Pool configured from `POOL_*` environment variables
    pub fn from_env() -> PoolResult<Self> {
        Self::new(PoolConfig::from_env()?)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Run one command and wait for it to finish
    ///
    /// Suspends while the pool is at capacity. Fails without spawning
    /// anything once shutdown has begun.
    pub async fn execute<I, S>(
        &self,
        command: impl Into<String>,
        args: I,
        options: ExecOptions,
    ) -> PoolResult<RunResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(RunRequest::new(command, args).with_options(options))
            .await
    }

    /// Run one prepared request and wait for it to finish
    pub async fn run(&self, request: RunRequest) -> PoolResult<RunResult> {
        ProcessExecutor::validate_command(&request.command)?;

        let permit = self.inner.admission.acquire().await?;
        let (ctx, child, kills) = self.launch(request, permit)?;

        let inner = Arc::clone(&self.inner);
        let span = run_span(ctx.run_id, ctx.pid, &ctx.command);
        let tracker = tokio::spawn(
            async move { lifecycle::track(&inner.registry, &inner.metrics, ctx, child, kills).await }
                .instrument(span),
        );

        tracker
            .await
            .map_err(|e| PoolError::TaskFailed(e.to_string()))?
    }

    /// Admit, spawn, register and arm the timer as one step
    fn launch(
        &self,
        request: RunRequest,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) -> PoolResult<(RunContext, tokio::process::Child, KillReceiver)> {
        let inner = &self.inner;
        let config = &inner.config;
        let run_id = inner.registry.next_run_id();

        // The fork/exec happens under the registry lock so a shutdown sweep
        // either sees the run or refuses it. Launches are serialized for that
        // long; admission has already bounded how many can be waiting here.
        let mut runs = inner.registry.lock();
        inner.admission.ensure_open()?;

        let child = match ProcessExecutor::spawn(&request) {
            Ok(child) => child,
            Err(e) => {
                inner.metrics.record_spawn_attempt();
                inner.metrics.record_failure();
                return Err(e);
            }
        };
        let started = Instant::now();
        let pid = child.id().unwrap_or(0);
        let (kill, kills) = lifecycle::kill_channel();

        let timeout = config.effective_timeout(request.options.timeout).map(|t| {
            TimeoutGuard::arm(run_id, kill.clone(), t, config.kill_signal, config.timeout_kill_grace)
        });
        let timed_out = timeout
            .as_ref()
            .map(TimeoutGuard::fired_flag)
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        let RunRequest { command, args, .. } = request;

        let run = ActiveRun::new(pid, started, command.clone(), args.clone(), kill, timeout, permit);
        let timed = run.has_timeout();
        let active = runs.insert(run_id, run);
        drop(runs);

        inner.metrics.record_start(active, config.max_concurrent);
        debug!(run_id, pid, command = %command, active, timed, "Run admitted");

        let ctx = RunContext {
            run_id,
            pid,
            command,
            args,
            started,
            timed_out,
        };
        Ok((ctx, child, kills))
    }

    /// Run many requests concurrently under the pool's ceiling
    ///
    /// The output has one entry per request, in input order. A rejected
    /// request becomes a [`RunResult::failed`] placeholder instead of failing
    /// the batch.
    pub async fn execute_many<I>(&self, requests: I) -> Vec<RunResult>
    where
        I: IntoIterator<Item = RunRequest>,
    {
        let runs = requests.into_iter().map(|request| {
            let command = request.command.clone();
            let args = request.args.clone();
            self.run(request).map(move |outcome| {
                outcome.unwrap_or_else(|e| {
                    debug!(command = %command, error = %e, "Batch entry rejected");
                    RunResult::failed(command, args, e.to_string())
                })
            })
        });
        join_all(runs).await
    }

    /// Snapshot of the aggregate counters
    pub fn metrics(&self) -> Metrics {
        self.inner.metrics.snapshot(self.inner.registry.len())
    }

    pub fn active_process_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.inner.registry.len() >= self.inner.config.max_concurrent
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.admission.is_closed()
    }

    /// Copies of the in-flight runs
    pub fn active_runs(&self) -> Vec<ActiveRunInfo> {
        self.inner.registry.snapshot()
    }

    /// Begin graceful shutdown, or join the one already in progress
    ///
    /// Admission closes and the kill signal goes out as soon as this is
    /// called; awaiting the handle waits for the drain. Later calls return
    /// the first call's handle and ignore their own `timeout`.
    ///
    /// # Panics
    /// The first call must happen within a Tokio runtime.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownHandle {
        self.inner.shutdown.begin(|| {
            self.inner.admission.close();

            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                shutdown::drain(
                    &inner.registry,
                    &inner.metrics,
                    inner.config.kill_signal,
                    timeout,
                )
                .await
            });

            async move {
                task.await.unwrap_or_else(|e| {
                    error!(error = %e, "Shutdown task failed");
                    ShutdownReport::default()
                })
            }
            .boxed()
        })
    }

    /// [`shutdown`](Self::shutdown) with the default 10 s deadline
    pub fn shutdown_default(&self) -> ShutdownHandle {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// SIGKILL every tracked process and clear the registry, without waiting
    ///
    /// Does not close admission. Returns the number of runs removed.
    pub fn force_kill_all(&self) -> usize {
        shutdown::force_kill_all(&self.inner.registry, &self.inner.metrics)
    }

    /// Spawn the host signal watcher; returns whether it was installed
    fn install_host_signal_watcher(&self) -> bool {
        if signals::is_test_environment() {
            info!("Test environment detected; host signal handling not installed");
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No Tokio runtime; host signal handling not installed");
                return false;
            }
        };

        let pool: Weak<PoolInner> = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            let received = match signals::wait_for_shutdown_signal().await {
                Ok(received) => received,
                Err(e) => {
                    error!(error = %e, "Failed to register host signal handlers");
                    return;
                }
            };
            drain_after_host_signal(&pool, received).await;
            std::process::exit(received.exit_code());
        });
        debug!("Host signal watcher installed");
        true
    }
}

/// Shut the pool down on behalf of the host; `None` if it was already dropped
async fn drain_after_host_signal(
    pool: &Weak<PoolInner>,
    received: HostSignal,
) -> Option<ShutdownReport> {
    warn!(signal = %received, "Host received termination signal");
    let inner = pool.upgrade()?;
    let report = ProcessPool { inner }
        .shutdown(HOST_SIGNAL_SHUTDOWN_TIMEOUT)
        .await;
    info!(
        signaled = report.signaled,
        force_killed = report.force_killed,
        "Pool drained after host signal"
    );
    Some(report)
}

impl Default for ProcessPool {
    fn default() -> Self {
        Self::from_valid(PoolConfig::default())
    }
}

impl std::fmt::Debug for ProcessPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPool")
            .field("config", &self.inner.config)
            .field("max_concurrent", &self.inner.admission.max_concurrent())
            .field("active", &self.inner.registry.len())
            .field("available_slots", &self.inner.admission.available_slots())
            .field("shutting_down", &self.inner.admission.is_closed())
            .field("shutdown_started", &self.inner.shutdown.is_started())
            .finish()
    }
}
