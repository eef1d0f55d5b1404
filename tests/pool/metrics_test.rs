/*!
 * Metrics Tests
 */

use super::support::pool_with;
use pretty_assertions::assert_eq;
use proc_pool::{ExecOptions, Metrics, PoolConfig, ProcessPool, RunRequest};

#[tokio::test]
async fn test_total_counts_every_admitted_call() {
    let pool = pool_with(2);
    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();
    pool.execute("false", Vec::<String>::new(), ExecOptions::new()).await.unwrap();
    let _ = pool
        .execute("does-not-exist-pool-test", Vec::<String>::new(), ExecOptions::new())
        .await;

    let metrics = pool.metrics();
    assert_eq!(metrics.total_executions, 3);
    assert_eq!(metrics.completed_processes, 2);
    assert_eq!(metrics.failed_processes, 1);
    assert!(metrics.total_executions >= metrics.completed_processes + metrics.failed_processes);
}

#[tokio::test]
async fn test_average_tracks_durations() {
    let pool = pool_with(2);
    pool.execute_many((0..2).map(|_| RunRequest::new("sleep", ["0.1"])))
        .await;

    let metrics = pool.metrics();
    assert_eq!(metrics.completed_processes, 2);
    assert!(metrics.average_execution_time_ms >= 90.0);
    assert!(metrics.average_execution_time_ms < 2000.0);
}

#[tokio::test]
async fn test_snapshot_is_a_copy() {
    let pool = pool_with(1);
    let before = pool.metrics();
    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();

    assert_eq!(before.total_executions, 0);
    assert_eq!(pool.metrics().total_executions, 1);
}

#[tokio::test]
async fn test_saturation_flag_is_sticky() {
    let pool = pool_with(1);
    assert!(!pool.metrics().max_concurrent_reached);

    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();
    assert!(pool.metrics().max_concurrent_reached);

    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();
    assert!(pool.metrics().max_concurrent_reached);
}

#[tokio::test]
async fn test_disabled_metrics_stay_zero() {
    let pool = ProcessPool::new(PoolConfig::new().with_metrics(false)).unwrap();
    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();
    let _ = pool
        .execute("does-not-exist-pool-test", Vec::<String>::new(), ExecOptions::new())
        .await;

    assert_eq!(pool.metrics(), Metrics::default());
}

#[tokio::test]
async fn test_metrics_serialize_snake_case() {
    let pool = pool_with(1);
    pool.execute("true", Vec::<String>::new(), ExecOptions::new()).await.unwrap();

    let json = serde_json::to_value(pool.metrics()).unwrap();
    assert_eq!(json["total_executions"], 1);
    assert_eq!(json["completed_processes"], 1);
    assert_eq!(json["max_concurrent_reached"], true);
    assert!(json.get("terminated_processes").is_none());
}
