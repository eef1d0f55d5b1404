/*!
 * Shutdown Tests
 * Graceful drain, forced kill and post-shutdown admission
 */

use super::support::{pool_with, spawn_run, wait_for_active, IGNORE_TERM};
use pretty_assertions::assert_eq;
use proc_pool::{ExecOptions, PoolError};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_shutdown_empty_pool() {
    let pool = pool_with(2);
    let report = pool.shutdown(Duration::from_secs(1)).await;

    assert_eq!(report.signaled, 0);
    assert_eq!(report.force_killed, 0);
    assert!(report.elapsed < Duration::from_secs(1));
    assert!(pool.is_shutting_down());
}

#[tokio::test]
async fn test_execute_after_shutdown_is_rejected() {
    let pool = pool_with(2);
    pool.shutdown(Duration::from_millis(100)).await;
    let before = pool.metrics();

    let err = pool
        .execute("echo", ["late"], ExecOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PoolError::ShuttingDown));
    assert!(err.is_admission());
    assert_eq!(pool.active_process_count(), 0);
    assert_eq!(pool.metrics(), before);
}

#[tokio::test]
async fn test_graceful_signal_ends_runs() {
    let pool = pool_with(2);
    let run = spawn_run(&pool, "sleep", &["10"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    let start = Instant::now();
    let report = pool.shutdown(Duration::from_secs(3)).await;

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(report.signaled, 1);
    assert_eq!(report.force_killed, 0);
    assert_eq!(pool.active_process_count(), 0);

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.signal, Some(15));
    assert!(!result.force_killed);
    assert_eq!(pool.metrics().completed_processes, 1);
}

#[tokio::test]
async fn test_survivors_are_force_killed() {
    let pool = pool_with(2);
    let run = spawn_run(&pool, "sh", &["-c", IGNORE_TERM], ExecOptions::new());
    wait_for_active(&pool, 1).await;
    // Give the shell time to install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    let start = Instant::now();
    let report = pool.shutdown(Duration::from_secs(1)).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(900), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    assert_eq!(report.signaled, 1);
    assert_eq!(report.force_killed, 1);
    assert_eq!(pool.active_process_count(), 0);

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("force-killed run never settled")
        .unwrap()
        .unwrap();
    assert!(result.force_killed);
    assert_eq!(result.signal, Some(9));

    let metrics = pool.metrics();
    assert_eq!(metrics.terminated_processes, 1);
    assert_eq!(metrics.completed_processes, 0);
}

#[tokio::test]
async fn test_force_kill_settles_caller_despite_open_pipe() {
    let pool = pool_with(1);
    // The shell ignores TERM; its sleep child keeps the captured pipes open
    let run = spawn_run(
        &pool,
        "sh",
        &["-c", "trap '' TERM; sleep 3; true"],
        ExecOptions::new().piped(),
    );
    wait_for_active(&pool, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let start = Instant::now();
    let report = pool.shutdown(Duration::from_millis(300)).await;
    assert_eq!(report.force_killed, 1);

    let result = tokio::time::timeout(Duration::from_millis(1500), run)
        .await
        .expect("caller must settle once the shell is killed")
        .unwrap()
        .unwrap();
    assert!(result.force_killed);
    assert_eq!(result.signal, Some(9));
    assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn test_default_shutdown_deadline() {
    let pool = pool_with(1);
    let run = spawn_run(&pool, "sleep", &["10"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    let report = pool.shutdown_default().await;
    assert_eq!(report.signaled, 1);
    assert_eq!(report.force_killed, 0);
    assert_eq!(pool.shutdown(Duration::ZERO).await, report);
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_concurrent_shutdowns_share_one_drain() {
    let pool = pool_with(2);
    let run = spawn_run(&pool, "sleep", &["10"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    let first = pool.shutdown(Duration::from_secs(3));
    let second = pool.shutdown(Duration::from_millis(1));
    let (a, b) = tokio::join!(first, second);

    assert_eq!(a, b);
    assert_eq!(a.signaled, 1);
    assert_eq!(a.force_killed, 0);

    // A late caller gets the finished report
    let late = pool.shutdown(Duration::ZERO).await;
    assert_eq!(late, a);

    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_wakes_queued_callers() {
    let pool = pool_with(1);
    let running = spawn_run(&pool, "sleep", &["10"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    let queued = spawn_run(&pool, "echo", &["queued"], ExecOptions::new());
    tokio::time::sleep(Duration::from_millis(50)).await;

    pool.shutdown(Duration::from_secs(3)).await;

    let err = queued.await.unwrap().unwrap_err();
    assert!(matches!(err, PoolError::ShuttingDown));
    running.await.unwrap().unwrap();
    assert_eq!(pool.metrics().total_executions, 1);
}

#[tokio::test]
async fn test_force_kill_all_clears_registry() {
    let pool = pool_with(3);
    let runs: Vec<_> = (0..2)
        .map(|_| spawn_run(&pool, "sleep", &["10"], ExecOptions::new()))
        .collect();
    wait_for_active(&pool, 2).await;

    assert_eq!(pool.force_kill_all(), 2);
    assert_eq!(pool.active_process_count(), 0);
    assert!(!pool.is_shutting_down());

    for run in runs {
        let result = run.await.unwrap().unwrap();
        assert!(result.force_killed);
    }

    let metrics = pool.metrics();
    assert_eq!(metrics.terminated_processes, 2);
    assert_eq!(metrics.completed_processes, 0);

    // Admission stays open after a forced kill
    let result = pool
        .execute("true", Vec::<String>::new(), ExecOptions::new())
        .await
        .unwrap();
    assert!(result.success());
}

#[tokio::test]
async fn test_force_kill_all_on_empty_pool() {
    let pool = pool_with(1);
    assert_eq!(pool.force_kill_all(), 0);
    assert_eq!(pool.metrics().terminated_processes, 0);
}
