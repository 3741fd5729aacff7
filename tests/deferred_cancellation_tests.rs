#![cfg(feature = "async")]
//! Cancellation semantics of `Deferred`.
//!
//! - Delayed work cancelled before its interval never runs and its
//!   callback is never invoked.
//! - Cancellation after delivery has no observable effect.
//! - Cancellation actions fire at most once, however many times `cancel`
//!   is called and from however many threads.
//! - `flat_map` forwards cancellation to the second stage once it exists.
//! - Completed starts leave no cancellation actions behind.
//! - Plain worker work is not cancellable.

use deferral::effect::deferred::{Deferred, DeferredError, zip, zip_all};
use rstest::rstest;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn counting_work(counter: &Arc<AtomicUsize>, value: i32) -> impl Fn() -> i32 + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        value
    }
}

// =============================================================================
// Delayed Work
// =============================================================================

#[rstest]
fn cancel_before_interval_suppresses_work_and_callback() {
    init_tracing();
    let runs = Arc::new(AtomicUsize::new(0));
    let deferred = Deferred::delayed(Duration::from_millis(100), counting_work(&runs, 1));

    let delivered = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&delivered);
    deferred.start(move |_| flag.store(true, Ordering::SeqCst));

    thread::sleep(Duration::from_millis(10));
    deferred.cancel();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(!delivered.load(Ordering::SeqCst));
    assert!(deferred.is_cancelled());
}

#[rstest]
fn waiting_on_cancelled_work_reports_cancellation() {
    init_tracing();
    let deferred = Deferred::delayed(Duration::from_secs(30), || 1);
    let waiter = {
        let deferred = deferred.clone();
        thread::spawn(move || deferred.try_wait())
    };
    thread::sleep(Duration::from_millis(50));
    deferred.cancel();
    assert_eq!(waiter.join().unwrap(), Err(DeferredError::Cancelled));
}

#[rstest]
fn cancel_after_delivery_has_no_effect() {
    let runs = Arc::new(AtomicUsize::new(0));
    let deferred = Deferred::delayed(Duration::from_millis(5), counting_work(&runs, 7));
    assert_eq!(deferred.wait(), 7);
    deferred.cancel();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[rstest]
fn starting_after_cancel_never_runs() {
    let runs = Arc::new(AtomicUsize::new(0));
    let deferred = Deferred::delayed(Duration::from_millis(5), counting_work(&runs, 1));
    deferred.cancel();
    assert_eq!(deferred.try_wait(), Err(DeferredError::Cancelled));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
fn every_start_is_cancelled_together() {
    let runs = Arc::new(AtomicUsize::new(0));
    let deferred = Deferred::delayed(Duration::from_millis(80), counting_work(&runs, 1));
    for _ in 0..3 {
        deferred.start(|_| {});
    }
    assert_eq!(deferred.cancellation_token().unwrap().pending_actions(), 3);
    deferred.cancel();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case(1)]
#[case(200)]
fn completed_delayed_starts_release_their_actions(#[case] restarts: usize) {
    init_tracing();
    let deferred = Deferred::delayed(Duration::from_millis(1), || 1);
    for _ in 0..restarts {
        assert_eq!(deferred.wait(), 1);
    }
    assert_eq!(deferred.cancellation_token().unwrap().pending_actions(), 0);
}

// =============================================================================
// Idempotence
// =============================================================================

#[rstest]
fn repeated_cancel_fires_action_once() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let deferred: Deferred<()> = Deferred::with_cancel(
        |_callback| {},
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    deferred.cancel();
    deferred.cancel();
    deferred.clone().cancel();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[rstest]
fn concurrent_cancel_fires_action_once() {
    for _ in 0..50 {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let deferred: Deferred<()> = Deferred::with_cancel(
            |_callback| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        let cancellers: Vec<_> = (0..8)
            .map(|_| {
                let deferred = deferred.clone();
                thread::spawn(move || deferred.cancel())
            })
            .collect();
        for canceller in cancellers {
            canceller.join().unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

#[rstest]
fn racing_cancel_and_timer_yield_exactly_one_outcome() {
    for iteration in 0..100_u64 {
        let runs = Arc::new(AtomicUsize::new(0));
        let deferred = Deferred::delayed(Duration::from_millis(iteration % 3), counting_work(&runs, 1));
        let (sender, receiver) = mpsc::channel();
        deferred.start(move |value| sender.send(value).unwrap());
        deferred.cancel();

        let delivered = receiver.recv_timeout(Duration::from_secs(2)).is_ok();
        thread::sleep(Duration::from_millis(5));
        let ran = runs.load(Ordering::SeqCst);

        assert_eq!(ran, usize::from(delivered));
        assert!(ran <= 1);
    }
}

// =============================================================================
// Combinators
// =============================================================================

#[rstest]
fn map_shares_cancellation() {
    let runs = Arc::new(AtomicUsize::new(0));
    let source = Deferred::delayed(Duration::from_millis(50), counting_work(&runs, 1));
    let mapped = source.map(|x| x + 1);
    mapped.cancel();
    assert_eq!(mapped.try_wait(), Err(DeferredError::Cancelled));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
fn flat_map_cancels_first_stage() {
    let runs = Arc::new(AtomicUsize::new(0));
    let first = Deferred::delayed(Duration::from_millis(50), counting_work(&runs, 1));
    let chained = first.clone().flat_map(|x| Deferred::pure(x + 1));
    chained.cancel();
    assert!(first.is_cancelled());
    assert_eq!(chained.try_wait(), Err(DeferredError::Cancelled));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
fn flat_map_cancels_second_stage_after_first_delivers() {
    init_tracing();
    let second_runs = Arc::new(AtomicUsize::new(0));
    let second_counter = Arc::clone(&second_runs);
    let (first_done, first_signal) = mpsc::channel();

    let chained = Deferred::from_work(move || {
        first_done.send(()).unwrap();
        1
    })
    .flat_map(move |x| {
        let counter = Arc::clone(&second_counter);
        Deferred::delayed(Duration::from_millis(150), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            x + 1
        })
    });

    let waiter = {
        let chained = chained.clone();
        thread::spawn(move || chained.try_wait())
    };
    first_signal.recv_timeout(Duration::from_secs(5)).unwrap();
    thread::sleep(Duration::from_millis(30));
    chained.cancel();

    assert_eq!(waiter.join().unwrap(), Err(DeferredError::Cancelled));
    thread::sleep(Duration::from_millis(200));
    assert_eq!(second_runs.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case(1)]
#[case(200)]
fn completed_flat_map_starts_release_stage_links(#[case] restarts: usize) {
    init_tracing();
    let chained = Deferred::pure(1).flat_map(|x| Deferred::delayed(Duration::from_millis(1), move || x));
    for _ in 0..restarts {
        assert_eq!(chained.wait(), 1);
    }
    assert_eq!(chained.cancellation_token().unwrap().pending_actions(), 0);
}

#[rstest]
fn zip_merges_branch_tokens() {
    let runs = Arc::new(AtomicUsize::new(0));
    let left = Deferred::delayed(Duration::from_millis(60), counting_work(&runs, 1));
    let right = Deferred::from_work(counting_work(&runs, 2));
    let combined = zip(left, right);
    assert!(combined.can_cancel());
    combined.cancel();
    assert_eq!(combined.try_wait(), Err(DeferredError::Cancelled));
    thread::sleep(Duration::from_millis(120));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[rstest]
fn zip_all_cancels_every_branch() {
    let runs = Arc::new(AtomicUsize::new(0));
    let combined = zip_all(
        (0..5).map(|value| Deferred::delayed(Duration::from_millis(60), counting_work(&runs, value))),
    );
    combined.cancel();
    assert_eq!(combined.try_wait(), Err(DeferredError::Cancelled));
    thread::sleep(Duration::from_millis(120));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Plain Worker Work
// =============================================================================

#[rstest]
fn worker_work_ignores_cancel() {
    let deferred = Deferred::from_work(|| 3);
    assert!(!deferred.can_cancel());
    deferred.cancel();
    assert!(!deferred.is_cancelled());
    assert_eq!(deferred.wait(), 3);
}

#[rstest]
fn pure_ignores_cancel() {
    let deferred = Deferred::pure(3);
    deferred.cancel();
    assert_eq!(deferred.wait(), 3);
}
