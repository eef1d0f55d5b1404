/*!
 * Signals Module
 * Kill signals for children and termination signals for the host
 */

mod delivery;
mod handler;
pub mod types;

// Re-export public API
pub use delivery::{send_signal, signal_or_warn};
pub use handler::{is_test_environment, wait_for_shutdown_signal, HostSignal, POOL_ENV_VAR};
pub use types::KillSignal;
