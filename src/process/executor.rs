/*!
 * Process Executor
 * Handles OS-level process spawning
 */

use crate::core::errors::{PoolError, PoolResult};
use crate::core::types::{RunRequest, StdioMode};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error};

/// Starts one OS process per admitted request
///
/// Arguments are passed to the executable directly; no shell is involved, so
/// the command string is not interpreted.
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Validate a command before admission
    pub fn validate_command(command: &str) -> PoolResult<()> {
        if command.trim().is_empty() {
            return Err(PoolError::InvalidCommand("Empty command".to_string()));
        }
        if command.contains('\0') {
            return Err(PoolError::InvalidCommand(
                "Command contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the command for a request
    pub fn command(request: &RunRequest) -> Command {
        let options = &request.options;
        let mut cmd = Command::new(&request.command);

        if !request.args.is_empty() {
            cmd.args(&request.args);
        }

        // Overrides on top of the inherited environment
        cmd.envs(&options.env);

        if let Some(ref dir) = options.cwd {
            cmd.current_dir(dir);
        }

        match options.stdio {
            StdioMode::Pipe => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        // A lifecycle task torn down with its runtime takes the child with it
        cmd.kill_on_drop(true);
        cmd
    }

    /// Spawn the process for a request
    pub fn spawn(request: &RunRequest) -> PoolResult<Child> {
        Self::validate_command(&request.command)?;

        let child = Self::command(request).spawn().map_err(|source| {
            error!(command = %request.command, error = %source, "Failed to spawn process");
            PoolError::SpawnFailed {
                command: request.command.clone(),
                source,
            }
        })?;

        debug!(
            command = %request.command,
            args = ?request.args,
            pid = child.id(),
            stdio = ?request.options.stdio,
            "Spawned OS process"
        );
        Ok(child)
    }
}
