/*!
 * Core Types
 * Common types shared by the pool, its collaborators and its callers
 */

use crate::core::limits::SIGNAL_EXIT_BASE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// OS-level process ID
pub type Pid = u32;

/// Pool-local identifier of one admitted run
pub type RunId = u64;

/// How the child's standard streams are wired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdioMode {
    /// Child shares the host terminal
    #[default]
    Inherit,
    /// stdout and stderr are captured into the result, stdin is closed
    Pipe,
}

/// Per-call execution options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecOptions {
    /// Overrides the pool's default timeout; `Some(Duration::ZERO)` disables it
    #[serde(default, with = "crate::core::serde::opt_millis")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub stdio: StdioMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Applied on top of the inherited environment
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Shorthand for `with_stdio(StdioMode::Pipe)`
    pub fn piped(self) -> Self {
        self.with_stdio(StdioMode::Pipe)
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// One unit of work handed to the pool by the command-construction layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: ExecOptions,
}

impl RunRequest {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: ExecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of one finished run
///
/// A non-zero `exit_code` is a normal result; interpreting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunResult {
    /// Exit code, or `128 + signo` when the process was killed by a signal
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(with = "crate::core::serde::millis")]
    pub duration: Duration,
    pub pid: Pid,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "crate::core::serde::is_false")]
    pub timed_out: bool,
    #[serde(skip_serializing_if = "crate::core::serde::is_false")]
    pub force_killed: bool,
}

impl RunResult {
    /// Placeholder result for a request that never produced a process
    pub fn failed(command: impl Into<String>, args: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: None,
            stderr: Some(message.into()),
            duration: Duration::ZERO,
            pid: 0,
            command: command.into(),
            args,
            signal: None,
            timed_out: false,
            force_killed: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Decompose an exit status into `(exit_code, terminating_signal)`
pub fn exit_code_of(status: ExitStatus) -> (i32, Option<i32>) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return (SIGNAL_EXIT_BASE + signo, Some(signo));
        }
    }
    (status.code().unwrap_or(-1), None)
}

/// Read-only view of an in-flight run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ActiveRunInfo {
    pub run_id: RunId,
    pub pid: Pid,
    pub command: String,
    pub args: Vec<String>,
    #[serde(with = "crate::core::serde::millis")]
    pub elapsed: Duration,
}
