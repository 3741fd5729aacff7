//! Continuation monad for continuation-passing style (CPS).
//!
//! A `Continuation<R, A>` is a computation that, instead of returning an
//! `A`, hands it to "the rest of the program" (a function `A -> R`) and
//! returns whatever that produces. Because the rest of the program is a
//! value, it can be skipped, which is how early exit is expressed.
//!
//! # Examples
//!
//! ```rust
//! use deferral::control::Continuation;
//!
//! let cont: Continuation<String, i32> = Continuation::pure(20).map(|x| x + 1);
//! assert_eq!(cont.run(|x| format!("got {x}")), "got 21");
//! ```
//!
//! Early exit:
//!
//! ```rust
//! use deferral::control::Continuation;
//!
//! fn checked_div(numerator: i32, denominator: i32) -> Continuation<i32, i32> {
//!     Continuation::call_with_current_continuation_once(move |exit| {
//!         if denominator == 0 {
//!             exit(0)
//!         } else {
//!             Continuation::pure(numerator / denominator)
//!         }
//!     })
//! }
//!
//! assert_eq!(checked_div(10, 2).run(|x| x + 1), 6);
//! assert_eq!(checked_div(10, 0).run(|x| x + 1), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The rest of the program, receiving an `A` and producing the final `R`.
pub type Rest<A, R> = Box<dyn FnOnce(A) -> R>;

type SharedRest<A, R> = Rc<RefCell<Option<Rest<A, R>>>>;

/// A one-shot CPS computation producing `A` for a final result `R`.
pub struct Continuation<R, A> {
    body: Box<dyn FnOnce(Rest<A, R>) -> R>,
}

impl<R: 'static, A: 'static> Continuation<R, A> {
    /// Creates a continuation from a function of the rest of the program.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(Rest<A, R>) -> R + 'static,
    {
        Self {
            body: Box::new(body),
        }
    }

    /// Passes `value` straight to the rest of the program.
    pub fn pure(value: A) -> Self {
        Self::new(move |rest| rest(value))
    }

    /// Runs the computation with `rest` as the final step.
    pub fn run<K>(self, rest: K) -> R
    where
        K: FnOnce(A) -> R + 'static,
    {
        (self.body)(Box::new(rest))
    }

    /// Transforms the value before it reaches the rest of the program.
    pub fn map<B: 'static, F>(self, function: F) -> Continuation<R, B>
    where
        F: FnOnce(A) -> B + 'static,
    {
        Continuation::new(move |rest: Rest<B, R>| self.run(move |value| rest(function(value))))
    }

    /// Continues with a computation chosen from the value.
    pub fn flat_map<B: 'static, F>(self, function: F) -> Continuation<R, B>
    where
        F: FnOnce(A) -> Continuation<R, B> + 'static,
    {
        Continuation::new(move |rest: Rest<B, R>| self.run(move |value| function(value).run(rest)))
    }

    /// Alias for [`flat_map`](Self::flat_map).
    #[inline]
    pub fn and_then<B: 'static, F>(self, function: F) -> Continuation<R, B>
    where
        F: FnOnce(A) -> Continuation<R, B> + 'static,
    {
        self.flat_map(function)
    }

    /// Discards the value and continues with `next`.
    #[inline]
    #[must_use]
    pub fn then<B: 'static>(self, next: Continuation<R, B>) -> Continuation<R, B> {
        self.flat_map(move |_| next)
    }

    /// Captures the current continuation as a one-shot `exit` function.
    ///
    /// Calling `exit(value)` yields a continuation that, when reached,
    /// delivers `value` to the rest of the program captured here and skips
    /// whatever `function` would have done afterwards.
    ///
    /// # Panics
    ///
    /// Panics if both the normal path and an `exit` continuation reach the
    /// captured rest of the program, which is only possible when an `exit`
    /// continuation escapes and is run after this computation finished.
    pub fn call_with_current_continuation_once<F>(function: F) -> Self
    where
        F: FnOnce(Box<dyn FnOnce(A) -> Self>) -> Self + 'static,
    {
        Self::new(move |rest: Rest<A, R>| {
            let captured: SharedRest<A, R> = Rc::new(RefCell::new(Some(rest)));
            let escape = Rc::clone(&captured);
            let exit: Box<dyn FnOnce(A) -> Self> = Box::new(move |value: A| {
                Self::new(move |_skipped: Rest<A, R>| resume(&escape, value))
            });
            function(exit).run(move |value| resume(&captured, value))
        })
    }
}

fn resume<A, R>(captured: &SharedRest<A, R>, value: A) -> R {
    let rest = captured.borrow_mut().take();
    match rest {
        Some(rest) => rest(value),
        None => panic!("captured continuation resumed twice"),
    }
}

impl<R, A> fmt::Debug for Continuation<R, A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Continuation")
            .finish_non_exhaustive()
    }
}
