/*!
 * Process Module
 * Admission, launch, timeout, lifecycle and shutdown of pooled processes
 */

mod admission;
pub mod config;
pub mod executor;
mod lifecycle;
mod pool;
mod registry;
pub mod shutdown;
mod timeout;

// Re-export for convenience
pub use config::PoolConfig;
pub use executor::ProcessExecutor;
pub use pool::ProcessPool;
pub use shutdown::{ShutdownHandle, ShutdownReport};
