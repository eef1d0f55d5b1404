/*!
 * pool-exec - Main Entry Point
 *
 * Runs one command through a pool configured from the environment, with
 * host signal handling enabled, and exits with the command's status.
 *
 * Usage: pool-exec <command> [args...]
 */

use anyhow::{bail, Context};
use proc_pool::{init_tracing, ExecOptions, PoolConfig, ProcessPool};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let Some(command) = argv.next() else {
        bail!("usage: pool-exec <command> [args...]");
    };
    let args: Vec<String> = argv.collect();

    let config = PoolConfig::from_env()
        .context("invalid pool configuration")?
        .with_host_signal_handling(true);
    let pool = ProcessPool::new(config)?;

    let result = pool
        .execute(command, args, ExecOptions::new())
        .await
        .context("command was not run")?;

    info!(
        exit_code = result.exit_code,
        duration_ms = result.duration.as_millis() as u64,
        timed_out = result.timed_out,
        "Command finished"
    );
    debug!(metrics = %serde_json::to_string(&pool.metrics())?, "Pool metrics");

    std::process::exit(result.exit_code);
}
