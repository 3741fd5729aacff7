#![cfg(feature = "async")]
//! Behavioural tests for `Deferred`.
//!
//! Covers construction, laziness, delivery threads, the functor/monad
//! combinators, the `Option`/`Result` specialisations and the blocking
//! bridges.

use deferral::effect::deferred::{Deferred, DeferredError};
use deferral::effect::IO;
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// Construction
// =============================================================================

#[rstest]
fn pure_is_delivered_synchronously() {
    let (sender, receiver) = mpsc::channel();
    Deferred::pure("now").start(move |value| sender.send(value).unwrap());
    assert_eq!(receiver.try_recv(), Ok("now"));
}

#[rstest]
fn new_uses_custom_start() {
    let deferred = Deferred::new(|callback| {
        thread::spawn(move || callback(String::from("from a thread")));
    });
    assert_eq!(deferred.wait(), "from a thread");
}

#[rstest]
fn from_work_runs_off_the_calling_thread() {
    let caller = thread::current().id();
    let (sender, receiver) = mpsc::channel();
    Deferred::from_work(|| thread::current().id()).start(move |worker| {
        sender.send(worker).unwrap();
    });
    let worker = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(worker, caller);
}

#[rstest]
fn start_returns_before_work_finishes() {
    let (sender, receiver) = mpsc::channel();
    let started = Instant::now();
    Deferred::from_work(|| {
        thread::sleep(Duration::from_millis(100));
        7
    })
    .start(move |value| sender.send(value).unwrap());
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(7));
}

#[rstest]
#[case(10)]
#[case(60)]
fn delayed_waits_at_least_the_interval(#[case] millis: u64) {
    let started = Instant::now();
    let value = Deferred::delayed(Duration::from_millis(millis), move || millis).wait();
    assert_eq!(value, millis);
    assert!(started.elapsed() >= Duration::from_millis(millis));
}

#[rstest]
fn work_does_not_run_until_started() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let deferred = Deferred::from_work(move || counter.fetch_add(1, Ordering::SeqCst))
        .map(|previous| previous + 1)
        .flat_map(Deferred::pure);

    thread::sleep(Duration::from_millis(30));
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    assert_eq!(deferred.wait(), 1);
    assert_eq!(deferred.wait(), 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[rstest]
fn from_io_and_delayed_io_run_the_description() {
    let io = IO::new(|| 40).fmap(|x| x + 2);
    assert_eq!(Deferred::from_io(io.clone()).wait(), 42);
    assert_eq!(Deferred::delayed_io(Duration::from_millis(5), io).wait(), 42);
}

// =============================================================================
// Combinators
// =============================================================================

#[rstest]
fn map_chain() {
    let deferred = Deferred::from_work(|| 3)
        .map(|x| x * 7)
        .fmap(|x| format!("{x}!"));
    assert_eq!(deferred.wait(), "21!");
}

#[rstest]
fn flat_map_sequences_work() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let first_log = Arc::clone(&order);
    let second_log = Arc::clone(&order);
    let deferred = Deferred::from_work(move || {
        first_log.lock().unwrap().push("first");
        1
    })
    .and_then(move |x| {
        let log = Arc::clone(&second_log);
        Deferred::from_work(move || {
            log.lock().unwrap().push("second");
            x + 1
        })
    });
    assert_eq!(deferred.wait(), 2);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[rstest]
fn then_keeps_second_value() {
    let deferred = Deferred::from_work(|| "ignored").then(Deferred::pure(5));
    assert_eq!(deferred.wait(), 5);
}

#[rstest]
fn map2_and_product_combine_in_parallel() {
    let later = Deferred::delayed(Duration::from_millis(5), || 2);
    let sum = Deferred::from_work(|| 1).map2(later, |a, b| a + b);
    assert_eq!(sum.wait(), 3);

    let pair = Deferred::pure('a').product(Deferred::from_work(|| 'b'));
    assert_eq!(pair.wait(), ('a', 'b'));
}

// =============================================================================
// Option / Result Payloads
// =============================================================================

#[rstest]
#[case("12", Ok(24))]
#[case("x", Err("invalid digit found in string".to_string()))]
fn map_ok_and_map_err(#[case] input: &'static str, #[case] expected: Result<i32, String>) {
    let parsed = Deferred::from_work(move || input.parse::<i32>())
        .map_err(|error| error.to_string())
        .map_ok(|x| x * 2);
    assert_eq!(parsed.wait(), expected);
}

#[rstest]
fn and_then_ok_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let failed: Deferred<Result<i32, &str>> = Deferred::from_work(|| Err("early"));
    let chained = failed.and_then_ok(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(x)
    });
    assert_eq!(chained.wait(), Err("early"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
fn and_then_deferred_runs_second_stage_on_ok() {
    let chained = Deferred::<Result<i32, String>>::ok(20)
        .and_then_deferred(|x| Deferred::from_work(move || Ok(x + 1)));
    assert_eq!(chained.wait(), Ok(21));
}

#[rstest]
fn and_then_deferred_passes_error_through_every_start() {
    let failed: Deferred<Result<i32, String>> = Deferred::from_work(|| Err("nope".into()));
    let chained = failed.and_then_deferred(|x| Deferred::from_work(move || Ok(x)));
    assert_eq!(chained.wait(), Err("nope".to_string()));
    assert_eq!(chained.wait(), Err("nope".to_string()));
}

#[rstest]
#[case(Some(4), Some(2))]
#[case(Some(3), None)]
#[case(None, None)]
fn option_helpers(#[case] input: Option<i32>, #[case] expected: Option<i32>) {
    let halved = Deferred::from_work(move || input)
        .and_then_some(|x| (x % 2 == 0).then_some(x))
        .map_some(|x| x / 2);
    assert_eq!(halved.wait(), expected);
    assert_eq!(Deferred::some(1).wait(), Some(1));
}

// =============================================================================
// Bridges
// =============================================================================

#[rstest]
fn to_io_starts_a_new_execution_per_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let io = Deferred::from_work(move || counter.fetch_add(1, Ordering::SeqCst)).to_io();
    assert_eq!(io.run_unsafe(), 0);
    assert_eq!(io.run_unsafe(), 1);
}

#[rstest]
fn io_from_deferred() {
    let io = IO::from_deferred(Deferred::delayed(Duration::from_millis(5), || "late"));
    assert_eq!(io.run_unsafe(), "late");
}

#[rstest]
fn dropped_callback_is_abandoned() {
    let silent: Deferred<i32> = Deferred::new(drop);
    assert_eq!(silent.try_wait(), Err(DeferredError::Abandoned));
}

#[rstest]
#[should_panic(expected = "deferred computation failed")]
fn wait_panics_when_nothing_is_delivered() {
    let silent: Deferred<i32> = Deferred::new(drop);
    silent.wait();
}

#[rstest]
fn many_threads_can_wait_on_clones() {
    let deferred = Deferred::from_work(|| 9).map(|x| x * x);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let deferred = deferred.clone();
            thread::spawn(move || deferred.wait())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 81);
    }
}

#[rstest]
fn display_is_opaque() {
    assert_eq!(Deferred::pure(1).to_string(), "<Deferred>");
}
