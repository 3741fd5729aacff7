#![cfg(feature = "async")]
//! `Deferred` driven from async code.
//!
//! Inside a tokio runtime the computation is scheduled on the caller's
//! runtime. Blocking waits work on multi-thread runtimes and are refused on
//! current-thread runtimes before anything is started.

use deferral::effect::deferred::{self, BlockingError, Deferred, DeferredError};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// run_async
// =============================================================================

#[rstest]
#[tokio::test]
async fn run_async_on_current_thread_runtime() {
    let value = Deferred::from_work(|| 20).map(|x| x + 1).run_async().await;
    assert_eq!(value, Ok(21));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_async_on_multi_thread_runtime() {
    let combined = deferred::zip(
        Deferred::delayed(Duration::from_millis(10), || "left"),
        Deferred::from_work(|| "right"),
    );
    assert_eq!(combined.run_async().await, Ok(("left", "right")));
}

#[rstest]
#[tokio::test]
async fn run_async_reports_cancellation() {
    let deferred = Deferred::delayed(Duration::from_secs(30), || 1);
    deferred.cancel();
    assert_eq!(deferred.run_async().await, Err(DeferredError::Cancelled));
}

#[rstest]
#[tokio::test]
async fn run_async_is_lazy_until_polled() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let pending = Deferred::from_work(move || counter.fetch_add(1, Ordering::SeqCst)).run_async();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(pending.await, Ok(0));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_run_async_tasks() {
    let tasks: Vec<_> = (0..16)
        .map(|value| tokio::spawn(Deferred::from_work(move || value * 3).run_async()))
        .collect();
    let mut values = Vec::new();
    for task in tasks {
        values.push(task.await.unwrap().unwrap());
    }
    assert_eq!(values, (0..16).map(|value| value * 3).collect::<Vec<_>>());
}

// =============================================================================
// Blocking Waits Inside a Runtime
// =============================================================================

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn try_wait_inside_multi_thread_runtime() {
    let deferred = Deferred::delayed(Duration::from_millis(5), || 42);
    assert_eq!(deferred.try_wait(), Ok(42));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn try_wait_from_blocking_task() {
    let result = tokio::task::spawn_blocking(|| Deferred::from_work(|| 7).try_wait())
        .await
        .unwrap();
    assert_eq!(result, Ok(7));
}

#[rstest]
#[tokio::test(flavor = "current_thread")]
async fn try_wait_on_current_thread_runtime_is_refused() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let deferred = Deferred::from_work(move || counter.fetch_add(1, Ordering::SeqCst));

    assert_eq!(
        deferred.try_wait(),
        Err(DeferredError::Blocking(BlockingError::CurrentThreadRuntime))
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test(flavor = "current_thread")]
#[should_panic(expected = "deferred computation failed")]
async fn wait_on_current_thread_runtime_panics() {
    Deferred::pure(1).wait();
}
