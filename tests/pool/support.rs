/*!
 * Shared helpers for pool tests
 */

use proc_pool::{ExecOptions, PoolConfig, PoolResult, ProcessPool, RunResult};
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn pool_with(max_concurrent: usize) -> ProcessPool {
    ProcessPool::new(PoolConfig::new().with_max_concurrent(max_concurrent)).unwrap()
}

/// Run a command on a background task
pub fn spawn_run(
    pool: &ProcessPool,
    command: &str,
    args: &[&str],
    options: ExecOptions,
) -> JoinHandle<PoolResult<RunResult>> {
    let pool = pool.clone();
    let command = command.to_string();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::spawn(async move { pool.execute(command, args, options).await })
}

/// Poll until the pool reports `count` active runs
pub async fn wait_for_active(pool: &ProcessPool, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.active_process_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("pool never reached the expected active count");
}

/// Shell snippet that ignores SIGTERM in the process the pool tracks
pub const IGNORE_TERM: &str = "trap '' TERM; exec sleep 10";
