/*!
 * Host Signal Handling
 *
 * Lets a pool owner react to its own termination signals. Nothing here is
 * installed implicitly; see `PoolConfig::handle_host_signals`.
 *
 * Signals handled:
 * - SIGINT (Ctrl-C in terminal)
 * - SIGTERM (default kill signal, used by systemd/Kubernetes)
 * - SIGQUIT (quit signal)
 */

use crate::core::limits::SIGNAL_EXIT_BASE;
use std::env;
use std::fmt;
use tokio::signal::unix::{signal, SignalKind};

/// Environment variable marking a test deployment
pub const POOL_ENV_VAR: &str = "POOL_ENV";

/// Termination signal received by the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl HostSignal {
    #[inline]
    pub const fn number(self) -> i32 {
        match self {
            Self::Interrupt => 2,
            Self::Terminate => 15,
            Self::Quit => 3,
        }
    }

    /// Status the host should exit with after handling this signal
    #[inline]
    pub const fn exit_code(self) -> i32 {
        SIGNAL_EXIT_BASE + self.number()
    }
}

impl fmt::Display for HostSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns the signal received, or `Err` if signal registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<HostSignal> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = sigint.recv() => HostSignal::Interrupt,
        _ = sigterm.recv() => HostSignal::Terminate,
        _ = sigquit.recv() => HostSignal::Quit,
    };
    Ok(received)
}

/// Whether the deployment looks like a test harness
///
/// Host signal wiring is suppressed there so the harness keeps its own handling.
pub fn is_test_environment() -> bool {
    env::var(POOL_ENV_VAR)
        .map(|v| v.eq_ignore_ascii_case("test"))
        .unwrap_or(false)
}
