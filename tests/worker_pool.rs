// tests/worker_pool.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use parbuild::engine::Collector;
use parbuild::errors::ParbuildError;
use parbuild::exec::WorkerPool;
use parbuild::task::{BodyError, Task, TaskOutcome, from_fn};
use parbuild_test_utils::init_tracing;
use parbuild_test_utils::scripted::Probe;
use tokio::time::Instant;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn pool_never_exceeds_max_workers() -> TestResult {
    init_tracing();
    let probe = Probe::new();
    let pool = WorkerPool::new(2);
    assert_eq!(pool.max_workers(), 2);

    let start = Instant::now();
    let handles: Vec<_> = (0..5)
        .map(|i| pool.submit(&probe.ok(&format!("t{i}"), 1000)))
        .collect();

    let mut collector = Collector::new();
    collector.await_all(handles).await?;
    pool.shutdown().await;

    assert_eq!(probe.max_concurrency(), 2);
    assert_eq!(collector.results().len(), 5);
    // Five one-second tasks through two slots take three rounds.
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(probe.started(), vec!["t0", "t1", "t2", "t3", "t4"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pool_with_enough_workers_runs_everything_at_once() -> TestResult {
    let probe = Probe::new();
    let pool = WorkerPool::new(20);

    let start = Instant::now();
    let handles: Vec<_> = (0..8)
        .map(|i| pool.submit(&probe.ok(&format!("t{i}"), 1000)))
        .collect();

    Collector::new().await_all(handles).await?;
    pool.shutdown().await;

    assert_eq!(probe.max_concurrency(), 8);
    assert!(start.elapsed() < Duration::from_secs(2));

    Ok(())
}

#[tokio::test]
async fn zero_workers_is_clamped_to_one() -> TestResult {
    let pool = WorkerPool::new(0);
    assert_eq!(pool.max_workers(), 1);

    let task = Task::new("only", Arc::new(from_fn(|| async { Ok::<(), BodyError>(()) })));
    let result = pool.submit(&task).await;
    assert!(result.is_success());
    pool.shutdown().await;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn handle_resolves_to_measured_result() -> TestResult {
    let probe = Probe::new();
    let pool = WorkerPool::new(1);

    let handle = pool.submit(&probe.failing("lint", 250));
    assert_eq!(handle.name(), "lint");

    let result = handle.await;
    assert_eq!(result.name, "lint");
    assert_eq!(result.outcome, TaskOutcome::Failed(BodyError::Exit(1)));
    assert!(result.duration >= Duration::from_millis(250));

    pool.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn collector_keeps_first_failure_and_awaits_everything() -> TestResult {
    let probe = Probe::new();
    let pool = WorkerPool::new(4);

    let handles = vec![
        pool.submit(&probe.failing("second", 500)),
        pool.submit(&probe.ok("slow", 2000)),
        pool.submit(&probe.failing("first", 200)),
    ];

    let mut collector = Collector::new();
    let outcome = collector.await_all(handles).await;
    pool.shutdown().await;

    match outcome {
        Err(ParbuildError::TaskFailed { task, source }) => {
            assert_eq!(task, "first");
            assert_eq!(source, BodyError::Exit(1));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }

    assert_eq!(collector.failure_count(), 2);
    assert_eq!(collector.first_failure().map(|(name, _)| name), Some("first"));

    // Arrival order, not submission order; the slow task is still waited for.
    let arrived: Vec<_> = collector.results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(arrived, vec!["first", "second", "slow"]);

    Ok(())
}

#[tokio::test]
async fn closure_body_runs_once_per_submission() -> TestResult {
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let task = Task::new(
        "count",
        Arc::new(from_fn(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<(), BodyError>(()) }
        })),
    );

    let pool = WorkerPool::new(2);
    let mut collector = Collector::new();
    collector.await_all([pool.submit(&task)]).await?;
    pool.shutdown().await;

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    Ok(())
}
