//! IO Monad - lazy synchronous side effects.
//!
//! The `IO` type describes a computation that may perform side effects.
//! Nothing happens until `run_unsafe` is called, which should be done at the
//! program's edge. An `IO` can be run any number of times; each run repeats
//! the effects.
//!
//! `IO` is `Send + Sync`, so a description can be handed to a worker thread
//! with [`Deferred::from_io`](crate::effect::deferred::Deferred::from_io) and
//! a deferred computation can be turned back into an `IO` with
//! [`IO::from_deferred`].
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::IO;
//!
//! let io = IO::pure(10)
//!     .fmap(|x| x * 2)
//!     .flat_map(|x| IO::pure(x + 1));
//! assert_eq!(io.run_unsafe(), 21);
//! ```
//!
//! # Side Effect Deferral
//!
//! ```rust
//! use deferral::effect::IO;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&runs);
//!
//! let io = IO::new(move || counter.fetch_add(1, Ordering::SeqCst));
//! assert_eq!(runs.load(Ordering::SeqCst), 0);
//!
//! io.run_unsafe();
//! io.run_unsafe();
//! assert_eq!(runs.load(Ordering::SeqCst), 2);
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use super::deferred::{Callback, Deferred};

/// A lazy, re-runnable description of a side-effecting computation.
///
/// # Monad Laws
///
/// 1. **Left Identity**: `IO::pure(a).flat_map(f) == f(a)`
/// 2. **Right Identity**: `m.flat_map(IO::pure) == m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
pub struct IO<A> {
    run_io: Arc<dyn Fn() -> A + Send + Sync>,
}

impl<A> Clone for IO<A> {
    fn clone(&self) -> Self {
        Self {
            run_io: Arc::clone(&self.run_io),
        }
    }
}

macro_rules! define_io_zip {
    ($name:ident; $($other:ident: $type:ident),+) => {
        paste::paste! {
            /// Runs this action, then each argument in order, and tuples the results.
            pub fn $name<$($type: 'static),+>(self, $($other: IO<$type>),+) -> IO<(A, $($type),+)> {
                IO::new(move || (self.run_unsafe(), $($other.run_unsafe()),+))
            }

            /// Runs this action, then each argument in order, and combines the
            /// results with `function`.
            pub fn [<$name _with>]<$($type: 'static,)+ Output: 'static, F>(
                self,
                $($other: IO<$type>,)+
                function: F,
            ) -> IO<Output>
            where
                F: Fn(A, $($type),+) -> Output + Send + Sync + 'static,
            {
                IO::new(move || function(self.run_unsafe(), $($other.run_unsafe()),+))
            }
        }
    };
}

impl<A: 'static> IO<A> {
    /// Creates a new IO action from a closure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::IO;
    ///
    /// let io = IO::new(|| 10 + 20);
    /// assert_eq!(io.run_unsafe(), 30);
    /// ```
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            run_io: Arc::new(action),
        }
    }

    /// Wraps a value with no side effects.
    pub fn pure(value: A) -> Self
    where
        A: Clone + Send + Sync,
    {
        Self::new(move || value.clone())
    }

    /// Runs the action and returns its result.
    ///
    /// This is the only place side effects happen.
    pub fn run_unsafe(&self) -> A {
        (self.run_io)()
    }

    /// Maps a function over the result.
    pub fn fmap<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: 'static,
    {
        IO::new(move || function(self.run_unsafe()))
    }

    /// Chains an action that depends on this one's result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::IO;
    ///
    /// let io = IO::pure(10).flat_map(|x| IO::new(move || x * 3));
    /// assert_eq!(io.run_unsafe(), 30);
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
        B: 'static,
    {
        IO::new(move || function(self.run_unsafe()).run_unsafe())
    }

    /// Alias for [`flat_map`](Self::flat_map).
    pub fn and_then<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
        B: 'static,
    {
        self.flat_map(function)
    }

    /// Runs this action for its effects, then `next`.
    #[must_use]
    pub fn then<B: 'static>(self, next: IO<B>) -> IO<B> {
        IO::new(move || {
            self.run_unsafe();
            next.run_unsafe()
        })
    }

    /// Alias for [`zip_with`](Self::zip_with).
    pub fn map2<B, C, F>(self, other: IO<B>, function: F) -> IO<C>
    where
        F: Fn(A, B) -> C + Send + Sync + 'static,
        B: 'static,
        C: 'static,
    {
        self.zip_with(other, function)
    }

    /// Alias for [`zip`](Self::zip).
    #[must_use]
    pub fn product<B: 'static>(self, other: IO<B>) -> IO<(A, B)> {
        self.zip(other)
    }

    define_io_zip!(zip; second: B);
    define_io_zip!(zip3; second: B, third: C);
    define_io_zip!(zip4; second: B, third: C, fourth: D);
    define_io_zip!(zip5; second: B, third: C, fourth: D, fifth: E);
    define_io_zip!(zip6; second: B, third: C, fourth: D, fifth: E, sixth: G);
    define_io_zip!(zip7; second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H);
    define_io_zip!(
        zip8;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I
    );
    define_io_zip!(
        zip9;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I, ninth: J
    );
    define_io_zip!(
        zip10;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I, ninth: J,
        tenth: K
    );

    /// Catches panics in an IO action and converts them to a recovery value.
    ///
    /// The handler receives the panic message, or `"Unknown panic"` when the
    /// payload is not a string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::IO;
    ///
    /// let panicking = IO::new(|| -> String { panic!("oops") });
    /// let recovered = IO::catch(panicking, |message| format!("recovered from {message}"));
    /// assert_eq!(recovered.run_unsafe(), "recovered from oops");
    /// ```
    pub fn catch<F>(io: Self, handler: F) -> Self
    where
        F: Fn(String) -> A + Send + Sync + 'static,
    {
        IO::new(move || match catch_unwind(AssertUnwindSafe(|| io.run_unsafe())) {
            Ok(value) => value,
            Err(payload) => {
                let message = if let Some(text) = payload.downcast_ref::<&str>() {
                    (*text).to_string()
                } else if let Some(text) = payload.downcast_ref::<String>() {
                    text.clone()
                } else {
                    "Unknown panic".to_string()
                };
                handler(message)
            }
        })
    }
}

// =============================================================================
// Deferred Bridges
// =============================================================================

#[cfg(feature = "async")]
impl<A: Send + 'static> IO<A> {
    /// Blocks on a deferred computation each time the action runs.
    ///
    /// # Panics
    ///
    /// Running the action panics if the deferred computation is cancelled,
    /// abandoned, or waited on from a current-thread tokio runtime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::IO;
    /// use deferral::effect::deferred::Deferred;
    ///
    /// let io = IO::from_deferred(Deferred::from_work(|| 6 * 7));
    /// assert_eq!(io.run_unsafe(), 42);
    /// ```
    pub fn from_deferred(deferred: Deferred<A>) -> Self {
        IO::new(move || deferred.wait())
    }

    /// Builds an action from a callback-style start operation.
    ///
    /// Running the action invokes `start` and blocks until it delivers.
    ///
    /// # Panics
    ///
    /// Same conditions as [`from_deferred`](Self::from_deferred).
    pub fn from_callback<F>(start: F) -> Self
    where
        F: Fn(Callback<A>) + Send + Sync + 'static,
    {
        Self::from_deferred(Deferred::new(start))
    }
}

// =============================================================================
// Option / Result Payloads
// =============================================================================

impl<A: 'static> IO<Option<A>> {
    /// Maps the inner value, leaving `None` untouched.
    pub fn map_some<B, F>(self, function: F) -> IO<Option<B>>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: 'static,
    {
        self.fmap(move |option| option.map(&function))
    }

    /// Chains an optional step, short-circuiting on `None`.
    pub fn and_then_some<B, F>(self, function: F) -> IO<Option<B>>
    where
        F: Fn(A) -> Option<B> + Send + Sync + 'static,
        B: 'static,
    {
        self.fmap(move |option| option.and_then(&function))
    }
}

impl<A: 'static, E: 'static> IO<Result<A, E>> {
    /// Maps the success value, passing errors through.
    pub fn map_ok<B, F>(self, function: F) -> IO<Result<B, E>>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: 'static,
    {
        self.fmap(move |result| result.map(&function))
    }

    /// Chains a fallible step, short-circuiting on `Err`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::IO;
    ///
    /// let io: IO<Result<i32, String>> = IO::new(|| "8".parse::<i32>().map_err(|e| e.to_string()));
    /// let halved = io.and_then_ok(|x| if x % 2 == 0 { Ok(x / 2) } else { Err("odd".into()) });
    /// assert_eq!(halved.run_unsafe(), Ok(4));
    /// ```
    pub fn and_then_ok<B, F>(self, function: F) -> IO<Result<B, E>>
    where
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
        B: 'static,
    {
        self.fmap(move |result| result.and_then(&function))
    }
}

// =============================================================================
// Convenience Constructors
// =============================================================================

impl IO<()> {
    /// Prints a line to standard output when run.
    pub fn print_line<S>(message: S) -> Self
    where
        S: fmt::Display + Send + Sync + 'static,
    {
        IO::new(move || {
            println!("{message}");
        })
    }

    /// Sleeps the running thread for `duration` when run.
    pub fn delay(duration: Duration) -> Self {
        IO::new(move || {
            std::thread::sleep(duration);
        })
    }
}

impl<A> fmt::Display for IO<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "<IO>")
    }
}

static_assertions::assert_impl_all!(IO<i32>: Send, Sync, Clone);
