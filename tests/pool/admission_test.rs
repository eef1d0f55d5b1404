/*!
 * Admission Tests
 * Concurrency ceiling, queuing and batch execution
 */

use super::support::{pool_with, spawn_run, wait_for_active};
use pretty_assertions::assert_eq;
use proc_pool::{ExecOptions, RunRequest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_ceiling_serializes_excess_runs() {
    let pool = pool_with(2);
    let start = Instant::now();

    let requests = (0..4).map(|_| RunRequest::new("sleep", ["0.2"]));
    let results = pool.execute_many(requests).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.success()));
    // Two waves of two
    assert!(elapsed >= Duration::from_millis(380), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(750), "took {:?}", elapsed);

    let metrics = pool.metrics();
    assert_eq!(metrics.total_executions, 4);
    assert_eq!(metrics.completed_processes, 4);
    assert!(metrics.max_concurrent_reached);
}

#[tokio::test]
async fn test_active_count_never_exceeds_ceiling() {
    let pool = pool_with(2);
    let done = Arc::new(AtomicBool::new(false));
    let peak = Arc::new(AtomicUsize::new(0));

    let sampler = {
        let pool = pool.clone();
        let done = Arc::clone(&done);
        let peak = Arc::clone(&peak);
        tokio::spawn(async move {
            while !done.load(Ordering::SeqCst) {
                peak.fetch_max(pool.active_process_count(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    };

    let results = pool
        .execute_many((0..6).map(|_| RunRequest::new("sleep", ["0.1"])))
        .await;
    done.store(true, Ordering::SeqCst);
    sampler.await.unwrap();

    assert_eq!(results.len(), 6);
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak {}", peak);
    assert!(peak >= 1);
    assert_eq!(pool.active_process_count(), 0);
}

#[tokio::test]
async fn test_capacity_reporting() {
    let pool = pool_with(1);
    assert!(!pool.is_at_capacity());

    let run = spawn_run(&pool, "sleep", &["0.3"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    assert!(pool.is_at_capacity());
    let active = pool.active_runs();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].command, "sleep");
    assert_eq!(active[0].args, vec!["0.3".to_string()]);

    run.await.unwrap().unwrap();
    assert!(!pool.is_at_capacity());
    assert!(pool.metrics().max_concurrent_reached);
}

#[tokio::test]
async fn test_waiter_is_admitted_when_slot_frees() {
    let pool = pool_with(1);
    let first = spawn_run(&pool, "sleep", &["0.2"], ExecOptions::new());
    wait_for_active(&pool, 1).await;

    let start = Instant::now();
    let second = pool
        .execute("true", Vec::<String>::new(), ExecOptions::new())
        .await
        .unwrap();

    assert!(second.success());
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(first.await.unwrap().unwrap().success());
}

#[tokio::test]
async fn test_execute_many_preserves_order() {
    let pool = pool_with(3);
    let requests = vec![
        RunRequest::new("sh", ["-c", "sleep 0.2; echo first"]).with_options(ExecOptions::new().piped()),
        RunRequest::new("does-not-exist-pool-test", Vec::<String>::new()),
        RunRequest::new("echo", ["third"]).with_options(ExecOptions::new().piped()),
    ];

    let results = pool.execute_many(requests).await;
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].stdout.as_deref().map(str::trim), Some("first"));

    // Rejected entries become placeholders instead of failing the batch
    assert_eq!(results[1].exit_code, -1);
    assert_eq!(results[1].pid, 0);
    assert_eq!(results[1].command, "does-not-exist-pool-test");
    assert!(results[1].stderr.as_deref().is_some_and(|s| !s.is_empty()));

    assert_eq!(results[2].stdout.as_deref().map(str::trim), Some("third"));

    let metrics = pool.metrics();
    assert_eq!(metrics.total_executions, 3);
    assert_eq!(metrics.completed_processes, 2);
    assert_eq!(metrics.failed_processes, 1);
}

#[tokio::test]
async fn test_execute_many_empty() {
    let pool = pool_with(1);
    let results = pool.execute_many(Vec::<RunRequest>::new()).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_dropped_caller_still_settles() {
    let pool = pool_with(1);
    let run = spawn_run(&pool, "sleep", &["0.1"], ExecOptions::new());
    wait_for_active(&pool, 1).await;
    run.abort();

    wait_for_active(&pool, 0).await;
    assert_eq!(pool.metrics().completed_processes, 1);
}
