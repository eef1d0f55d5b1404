/*!
 * Pool Limits and Constants
 *
 * Defaults and fixed deadlines used across the pool.
 */

use std::time::Duration;

// =============================================================================
// ADMISSION
// =============================================================================

/// Default concurrency ceiling
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default per-run timeout (5 minutes)
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Default graceful shutdown deadline
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Deadline used when the host itself is asked to terminate
pub const HOST_SIGNAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5_000);

/// How long captured pipes may stay open after the tracked process exited.
/// A descendant holding the pipe past this only loses its later output.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(200);

// =============================================================================
// SIGNALS
// =============================================================================

/// Shell convention: a process killed by signal N reports status 128 + N
pub const SIGNAL_EXIT_BASE: i32 = 128;
