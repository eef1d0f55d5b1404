/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::types::Pid;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Pool operation result
///
/// # Must Use
/// A rejected call never spawned a process; the caller decides whether to retry
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors surfaced by the pool
///
/// Only admission, validation and launch problems are errors. A process that
/// ran and exited non-zero is reported through [`RunResult`](crate::RunResult).
#[derive(Error, Debug, Diagnostic)]
pub enum PoolError {
    #[error("Pool is shutting down; no new runs are admitted")]
    #[diagnostic(
        code(pool::shutting_down),
        help("Shutdown has begun. Create a new pool to run more commands.")
    )]
    ShuttingDown,

    #[error("Invalid command: {0}")]
    #[diagnostic(
        code(pool::invalid_command),
        help("The command must name an executable.")
    )]
    InvalidCommand(String),

    #[error("Failed to spawn '{command}': {source}")]
    #[diagnostic(
        code(pool::spawn_failed),
        help("Check that the executable exists, is on PATH and is executable.")
    )]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting on process {pid}: {source}")]
    #[diagnostic(code(pool::wait_failed))]
    WaitFailed {
        pid: Pid,
        #[source]
        source: io::Error,
    },

    #[error("Invalid pool configuration: {0}")]
    #[diagnostic(code(pool::invalid_config))]
    InvalidConfig(String),

    #[error("Unknown signal: {0}")]
    #[diagnostic(
        code(pool::invalid_signal),
        help("Use a POSIX signal name such as SIGTERM, SIGINT or SIGKILL.")
    )]
    InvalidSignal(String),

    #[error("Lifecycle task failed: {0}")]
    #[diagnostic(code(pool::task_failed))]
    TaskFailed(String),
}

impl PoolError {
    /// Whether the call was rejected before anything was spawned
    #[inline]
    #[must_use]
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::InvalidCommand(_))
    }

    #[inline]
    #[must_use]
    pub fn is_spawn(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. })
    }
}
