//! `Deferred` - lazily started asynchronous computations with cancellation.
//!
//! A `Deferred<A>` describes *how* to start a computation that eventually
//! produces one value of type `A`. Nothing runs until [`Deferred::start`] is
//! called with a completion callback; the callback is then invoked exactly
//! once, possibly on another thread.
//!
//! # Design Philosophy
//!
//! - **Exactly-once delivery**: callbacks are `FnOnce`, so a start operation
//!   cannot deliver twice. Combinators never clone or retain a callback after
//!   invoking it.
//! - **Explicit cancellation**: every `Deferred` may carry a
//!   [`CancellationToken`]. `map` shares its source's token, `zip` merges the
//!   tokens of its branches and `flat_map` links the token of whichever second
//!   stage it produces. Cancellation is advisory: it only suppresses work that
//!   has not started.
//! - **No failure channel**: choose `A = Result<T, E>` or `Option<T>` and use
//!   the specialised combinators (`map_ok`, `and_then_ok`, `map_some`, ...).
//!
//! # Threading
//!
//! Work runs on the shared [`runtime`]: plain work on its blocking pool,
//! delayed work after a timer. `start`, `map`, `flat_map`, `zip` and `cancel`
//! never block. Only [`Deferred::wait`] and [`Deferred::try_wait`] suspend
//! the calling thread; calling them from a thread of a current-thread tokio
//! runtime is rejected, and calling them from inside work submitted to a
//! saturated blocking pool can deadlock.
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::deferred::{self, Deferred};
//! use std::time::Duration;
//!
//! let slow = Deferred::delayed(Duration::from_millis(20), || 1);
//! let fast = Deferred::from_work(|| 2);
//!
//! let total = deferred::zip(slow, fast).map(|(a, b)| a + b);
//! assert_eq!(total.wait(), 3);
//! ```
//!
//! Cancelling delayed work before it fires:
//!
//! ```rust
//! use deferral::effect::deferred::{Deferred, DeferredError};
//! use std::time::Duration;
//!
//! let never = Deferred::delayed(Duration::from_secs(60), || "too late");
//! never.cancel();
//! assert_eq!(never.try_wait(), Err(DeferredError::Cancelled));
//! ```

mod cancellation;
mod config;
mod error;
mod parallel;
pub mod runtime;

pub use cancellation::{ActionKey, CancelAction, CancellationToken};
pub use config::{MAX_BLOCKING_THREADS_ENV, RuntimeConfig, WORKER_THREADS_ENV};
pub use error::{BlockingError, ConfigError, DeferredError, RuntimeError};
pub use parallel::{
    zip, zip_all, zip_with, zip3, zip3_with, zip4, zip4_with, zip5, zip5_with, zip6, zip6_with,
    zip7, zip7_with, zip8, zip8_with, zip9, zip9_with, zip10, zip10_with,
};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::IO;

/// The completion callback handed to a start operation.
///
/// Being `FnOnce`, it can deliver at most one value.
pub type Callback<A> = Box<dyn FnOnce(A) + Send + 'static>;

type StartFunction<A> = dyn Fn(Callback<A>) + Send + Sync + 'static;

/// A lazily started asynchronous computation producing one `A`.
///
/// Cloning is cheap and shares both the start operation and the
/// cancellation token.
///
/// # Laws
///
/// For values observed through `wait`:
///
/// - **Functor Composition**: `d.map(f).map(g) == d.map(|x| g(f(x)))`
/// - **Left Identity**: `Deferred::pure(a).flat_map(f) == f(a)`
/// - **Right Identity**: `d.flat_map(Deferred::pure) == d`
pub struct Deferred<A> {
    start_function: Arc<StartFunction<A>>,
    cancellation: Option<CancellationToken>,
}

impl<A> Clone for Deferred<A> {
    fn clone(&self) -> Self {
        Self {
            start_function: Arc::clone(&self.start_function),
            cancellation: self.cancellation.clone(),
        }
    }
}

// =============================================================================
// Construction
// =============================================================================

impl<A: Send + 'static> Deferred<A> {
    /// Creates a `Deferred` from a custom start operation.
    ///
    /// `start` receives the completion callback and must invoke it at most
    /// once. It may be called several times; each call is an independent
    /// execution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let deferred = Deferred::new(|callback| callback(42));
    /// assert_eq!(deferred.wait(), 42);
    /// ```
    pub fn new<F>(start: F) -> Self
    where
        F: Fn(Callback<A>) + Send + Sync + 'static,
    {
        Self::from_parts(start, None)
    }

    /// Creates a `Deferred` from a custom start operation and a cancellation
    /// action.
    ///
    /// The action runs at most once, the first time the `Deferred` (or any
    /// combinator built from it) is cancelled.
    pub fn with_cancel<F, C>(start: F, on_cancel: C) -> Self
    where
        F: Fn(Callback<A>) + Send + Sync + 'static,
        C: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        token.register(on_cancel);
        Self::from_parts(start, Some(token))
    }

    pub(crate) fn from_parts<F>(start: F, cancellation: Option<CancellationToken>) -> Self
    where
        F: Fn(Callback<A>) + Send + Sync + 'static,
    {
        Self {
            start_function: Arc::new(start),
            cancellation,
        }
    }

    /// Wraps a value; `start` delivers it synchronously on the caller's thread.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    /// use std::sync::mpsc;
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// Deferred::pure(7).start(move |value| sender.send(value).unwrap());
    /// // Delivered before `start` returned.
    /// assert_eq!(receiver.try_recv(), Ok(7));
    /// ```
    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::new(move |callback| callback(value.clone()))
    }

    /// A `Deferred` that delivers `value` on its first start only.
    ///
    /// Used where a combinator starts the result exactly once; later starts
    /// drop their callback.
    fn once(value: A) -> Self {
        let slot = Mutex::new(Some(value));
        Self::new(move |callback| {
            if let Some(value) = slot.lock().take() {
                callback(value);
            }
        })
    }

    /// Runs `work` on the worker pool and delivers its result from there.
    ///
    /// Work handed to the pool is not preemptible, so the result carries no
    /// cancellation token and [`cancel`](Self::cancel) is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let deferred = Deferred::from_work(|| (1..=10).sum::<i32>());
    /// assert!(!deferred.can_cancel());
    /// assert_eq!(deferred.wait(), 55);
    /// ```
    pub fn from_work<F>(work: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        Self::new(move |callback| {
            let work = Arc::clone(&work);
            tracing::trace!("submitting deferred work");
            runtime::submit(move || callback(work()));
        })
    }

    /// Runs `work` on the worker pool once `interval` has elapsed.
    ///
    /// Each start registers a cancellation action on this `Deferred`'s token.
    /// If cancellation wins the race with the timer, `work` never runs and
    /// the callback is dropped without being invoked. If the timer wins, the
    /// action is removed from the token before the value is delivered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    /// use std::time::Duration;
    ///
    /// let deferred = Deferred::delayed(Duration::from_millis(10), || "ready");
    /// assert!(deferred.can_cancel());
    /// assert_eq!(deferred.wait(), "ready");
    /// ```
    pub fn delayed<F>(interval: Duration, work: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        let token = CancellationToken::new();
        let registry = token.clone();
        let work = Arc::new(work);
        Self::from_parts(
            move |callback| {
                let guard = Arc::new(FireGuard::new());
                let firing = Arc::clone(&guard);
                let cancelling = Arc::clone(&guard);
                let fired_registry = registry.clone();
                let work = Arc::clone(&work);
                tracing::trace!(?interval, "scheduling delayed work");
                let task = runtime::submit_after(interval, move || {
                    if firing.try_fire() {
                        firing.release(&fired_registry);
                        callback(work());
                    } else {
                        tracing::debug!("delayed work suppressed by cancellation");
                    }
                });
                let key = registry.register(move || {
                    if cancelling.try_cancel() {
                        task.abort();
                    }
                });
                guard.hold(&registry, key);
            },
            Some(token),
        )
    }

    /// Runs a synchronous [`IO`] on the worker pool.
    ///
    /// Like [`from_work`](Self::from_work), the result is not cancellable.
    pub fn from_io(io: IO<A>) -> Self {
        Self::from_work(move || io.run_unsafe())
    }

    /// Runs a synchronous [`IO`] on the worker pool after `interval`.
    pub fn delayed_io(interval: Duration, io: IO<A>) -> Self {
        Self::delayed(interval, move || io.run_unsafe())
    }
}

// =============================================================================
// Execution and Cancellation
// =============================================================================

impl<A: Send + 'static> Deferred<A> {
    /// Starts the computation.
    ///
    /// `callback` is invoked at most once with the result, on whichever
    /// thread produces it. Returns without waiting for the result.
    pub fn start<F>(&self, callback: F)
    where
        F: FnOnce(A) + Send + 'static,
    {
        (self.start_function)(Box::new(callback));
    }

    pub(crate) fn start_boxed(&self, callback: Callback<A>) {
        (self.start_function)(callback);
    }

    /// Requests cancellation.
    ///
    /// Every registered cancellation action runs at most once in total;
    /// calling `cancel` again does nothing. Work that already started still
    /// delivers its value.
    pub fn cancel(&self) {
        if let Some(token) = &self.cancellation {
            token.cancel();
        }
    }

    /// Returns `true` if this computation carries a cancellation token.
    pub const fn can_cancel(&self) -> bool {
        self.cancellation.is_some()
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// The cancellation token shared with combinators built from this value.
    pub const fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    fn missing_value(&self) -> DeferredError {
        if self.is_cancelled() {
            DeferredError::Cancelled
        } else {
            tracing::warn!("deferred computation dropped its callback without a value");
            DeferredError::Abandoned
        }
    }
}

// =============================================================================
// Bridges
// =============================================================================

impl<A: Send + 'static> Deferred<A> {
    /// Starts the computation when first polled and resolves to its value.
    ///
    /// # Errors
    ///
    /// - `DeferredError::Cancelled` if the callback was dropped after
    ///   cancellation.
    /// - `DeferredError::Abandoned` if it was dropped for any other reason.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let runtime = tokio::runtime::Runtime::new().unwrap();
    /// let value = runtime.block_on(async {
    ///     Deferred::from_work(|| 21).map(|x| x * 2).run_async().await
    /// });
    /// assert_eq!(value, Ok(42));
    /// ```
    pub async fn run_async(self) -> Result<A, DeferredError> {
        let (sender, receiver) = oneshot::channel();
        self.start(move |value| {
            let _ = sender.send(value);
        });
        receiver.await.map_err(|_| self.missing_value())
    }

    /// Starts the computation and blocks the calling thread until it delivers.
    ///
    /// # Errors
    ///
    /// - `DeferredError::Blocking` if the calling thread belongs to a
    ///   current-thread tokio runtime. Nothing is started in that case.
    /// - `DeferredError::Cancelled` / `DeferredError::Abandoned` as for
    ///   [`run_async`](Self::run_async).
    pub fn try_wait(&self) -> Result<A, DeferredError> {
        runtime::try_run_blocking(self.clone().run_async())?
    }

    /// Starts the computation and blocks until it delivers.
    ///
    /// # Panics
    ///
    /// Panics if [`try_wait`](Self::try_wait) returns an error.
    pub fn wait(&self) -> A {
        self.try_wait()
            .unwrap_or_else(|error| panic!("deferred computation failed: {error}"))
    }

    /// Converts this computation into a synchronous [`IO`] that blocks on it.
    ///
    /// Each run of the `IO` starts the computation anew.
    ///
    /// # Panics
    ///
    /// Running the returned `IO` panics under the same conditions as
    /// [`wait`](Self::wait).
    pub fn to_io(self) -> IO<A> {
        IO::new(move || self.wait())
    }
}

// =============================================================================
// Functor / Monad Operations
// =============================================================================

impl<A: Send + 'static> Deferred<A> {
    /// Transforms the delivered value.
    ///
    /// The result shares this computation's cancellation token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let deferred = Deferred::pure(20).map(|x| x + 1).map(|x| x * 2);
    /// assert_eq!(deferred.wait(), 42);
    /// ```
    pub fn map<B, F>(self, function: F) -> Deferred<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        let cancellation = self.cancellation.clone();
        let function = Arc::new(function);
        Deferred::from_parts(
            move |callback: Callback<B>| {
                let function = Arc::clone(&function);
                self.start(move |value| callback(function(value)));
            },
            cancellation,
        )
    }

    /// Alias for [`map`](Self::map).
    pub fn fmap<B, F>(self, function: F) -> Deferred<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map(function)
    }

    /// Chains a second computation produced from the first one's value.
    ///
    /// The result owns a fresh token linked to this computation's token.
    /// Each time a second stage is produced, its token is linked in before
    /// it starts, so cancelling the chain after the first stage has
    /// delivered still cancels the second stage.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let deferred = Deferred::from_work(|| 10)
    ///     .flat_map(|x| Deferred::from_work(move || x * 3));
    /// assert_eq!(deferred.wait(), 30);
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> Deferred<B>
    where
        F: Fn(A) -> Deferred<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(source) = &self.cancellation {
            token.link(source);
        }
        let chain = token.clone();
        let function = Arc::new(function);
        Deferred::from_parts(
            move |callback: Callback<B>| {
                let function = Arc::clone(&function);
                let chain = chain.clone();
                self.start(move |value| {
                    let next = function(value);
                    let key = next.cancellation_token().and_then(|stage| chain.link(stage));
                    let Some(key) = key else {
                        next.start_boxed(callback);
                        return;
                    };
                    next.start(move |result| {
                        chain.deregister(key);
                        callback(result);
                    });
                });
            },
            Some(token),
        )
    }

    /// Alias for [`flat_map`](Self::flat_map).
    pub fn and_then<B, F>(self, function: F) -> Deferred<B>
    where
        F: Fn(A) -> Deferred<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.flat_map(function)
    }

    /// Runs `next` after this computation, discarding this one's value.
    #[must_use]
    pub fn then<B>(self, next: Deferred<B>) -> Deferred<B>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| next.clone())
    }

    /// Runs both computations concurrently and pairs their values.
    ///
    /// Equivalent to the free function [`zip`].
    #[must_use]
    pub fn zip<B>(self, other: Deferred<B>) -> Deferred<(A, B)>
    where
        B: Send + 'static,
    {
        zip(self, other)
    }

    /// Runs both computations concurrently and combines their values.
    pub fn zip_with<B, C, F>(self, other: Deferred<B>, function: F) -> Deferred<C>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        zip_with(function, self, other)
    }

    /// Alias for [`zip_with`](Self::zip_with).
    pub fn map2<B, C, F>(self, other: Deferred<B>, function: F) -> Deferred<C>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        self.zip_with(other, function)
    }

    /// Alias for [`zip`](Self::zip).
    #[must_use]
    pub fn product<B>(self, other: Deferred<B>) -> Deferred<(A, B)>
    where
        B: Send + 'static,
    {
        self.zip(other)
    }
}

// =============================================================================
// Option Payloads
// =============================================================================

impl<A: Send + 'static> Deferred<Option<A>> {
    /// Wraps `value` in `Some`.
    pub fn some(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::pure(Some(value))
    }

    /// Maps the inner value, leaving `None` untouched.
    pub fn map_some<B, F>(self, function: F) -> Deferred<Option<B>>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map(move |option| option.map(&function))
    }

    /// Chains an optional step, short-circuiting on `None`.
    pub fn and_then_some<B, F>(self, function: F) -> Deferred<Option<B>>
    where
        F: Fn(A) -> Option<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map(move |option| option.and_then(&function))
    }
}

// =============================================================================
// Result Payloads
// =============================================================================

impl<A, E> Deferred<Result<A, E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Wraps `value` in `Ok`.
    pub fn ok(value: A) -> Self
    where
        A: Clone + Sync,
        E: Clone + Sync,
    {
        Self::pure(Ok(value))
    }

    /// Maps the success value, passing errors through.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let parsed = Deferred::from_work(|| "21".parse::<i32>()).map_ok(|x| x * 2);
    /// assert_eq!(parsed.wait(), Ok(42));
    /// ```
    pub fn map_ok<B, F>(self, function: F) -> Deferred<Result<B, E>>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map(move |result| result.map(&function))
    }

    /// Maps the error value, passing successes through.
    pub fn map_err<E2, F>(self, function: F) -> Deferred<Result<A, E2>>
    where
        F: Fn(E) -> E2 + Send + Sync + 'static,
        E2: Send + 'static,
    {
        self.map(move |result| result.map_err(&function))
    }

    /// Chains a fallible synchronous step, short-circuiting on `Err`.
    pub fn and_then_ok<B, F>(self, function: F) -> Deferred<Result<B, E>>
    where
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map(move |result| result.and_then(&function))
    }

    /// Chains a fallible asynchronous step, started only on `Ok`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let failed: Deferred<Result<i32, String>> =
    ///     Deferred::from_work(|| Err("boom".to_string()));
    /// let chained = failed.and_then_deferred(|x| Deferred::from_work(move || Ok(x + 1)));
    /// assert_eq!(chained.wait(), Err("boom".to_string()));
    /// ```
    pub fn and_then_deferred<B, F>(self, function: F) -> Deferred<Result<B, E>>
    where
        F: Fn(A) -> Deferred<Result<B, E>> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.flat_map(move |result| match result {
            Ok(value) => function(value),
            Err(error) => Deferred::once(Err(error)),
        })
    }
}

// =============================================================================
// Fire Guard
// =============================================================================

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Decides the race between a delayed firing and its cancellation.
///
/// Also tracks the start's cancellation action so a fired timer can remove
/// it from the shared token.
struct FireGuard {
    state: AtomicU8,
    registration: Mutex<Option<ActionKey>>,
}

impl FireGuard {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            registration: Mutex::new(None),
        }
    }

    /// Records `key`, or removes it right away if the timer already fired.
    fn hold(&self, token: &CancellationToken, key: ActionKey) {
        let mut registration = self.registration.lock();
        if self.state.load(Ordering::Acquire) == FIRED {
            token.deregister(key);
        } else {
            *registration = Some(key);
        }
    }

    fn release(&self, token: &CancellationToken) {
        let key = self.registration.lock().take();
        if let Some(key) = key {
            token.deregister(key);
        }
    }

    fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn try_cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

// =============================================================================
// Display / Debug
// =============================================================================

impl<A> fmt::Display for Deferred<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "<Deferred>")
    }
}

impl<A> fmt::Debug for Deferred<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Deferred")
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Deferred<i32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(Deferred<String>: Send, Sync, Clone);
