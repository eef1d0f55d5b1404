/*!
 * Process Pool Library
 * Bounded-concurrency execution of external processes
 *
 * - Admission control against a concurrency ceiling
 * - Per-run timeouts enforced with a kill signal
 * - Aggregate execution metrics
 * - Graceful-then-forced shutdown of all in-flight runs
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod signals;

// Re-exports
pub use crate::core::{
    ActiveRunInfo, ExecOptions, Pid, PoolError, PoolResult, RunId, RunRequest, RunResult,
    StdioMode,
};
pub use monitoring::{init_tracing, Metrics};
pub use process::{PoolConfig, ProcessPool, ShutdownHandle, ShutdownReport};
pub use signals::KillSignal;
