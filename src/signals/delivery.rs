/*!
 * Signal Delivery
 * Sends kill signals to child processes by OS PID
 */

use super::types::KillSignal;
use crate::core::types::Pid;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;
use tracing::{debug, warn};

/// Send `signal` to `pid`
///
/// Returns `Ok(false)` when the process no longer exists. PID 0 and values
/// outside the positive `pid_t` range are refused, since `kill(2)` would treat
/// them as process-group or broadcast targets.
pub fn send_signal(pid: Pid, signal: KillSignal) -> nix::Result<bool> {
    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => {
            warn!(pid, "Refusing to signal non-positive PID");
            return Ok(false);
        }
    };

    match kill(NixPid::from_raw(raw), signal.as_nix()) {
        Ok(()) => {
            debug!(pid, signal = %signal, "Signal delivered");
            Ok(true)
        }
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Best-effort delivery that logs instead of failing
pub fn signal_or_warn(pid: Pid, signal: KillSignal) -> bool {
    match send_signal(pid, signal) {
        Ok(delivered) => delivered,
        Err(e) => {
            warn!(pid, signal = %signal, error = %e, "Failed to deliver signal");
            false
        }
    }
}
