//! # deferral
//!
//! Lazily started, cancellable asynchronous computations for Rust, together
//! with the small family of functional effect types they interoperate with.
//!
//! ## Overview
//!
//! - **Deferred**: a description of asynchronous work that starts on demand,
//!   delivers exactly one value through a callback and can be cancelled
//!   before it runs. Computations compose with `map`, `flat_map` and an
//!   N-way parallel `zip`.
//! - **Synchronous effects**: `IO`, `Reader` and `Writer`.
//! - **Control structures**: `Continuation` with one-shot call/cc, and
//!   tuple-building helpers for `Option` and `Result`.
//! - **Type classes**: `Semigroup` and `Monoid`.
//!
//! ## Feature Flags
//!
//! - `typeclass`: `Semigroup` and `Monoid`
//! - `control`: `Continuation`, `Option`/`Result` zips, `ResultExt`
//! - `effect`: `IO`, `Reader`, `Writer`
//! - `async`: `Deferred` and its tokio-backed worker runtime
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use deferral::prelude::*;
//! use std::time::Duration;
//!
//! let greeting = Deferred::delayed(Duration::from_millis(10), || "hello");
//! let subject = Deferred::from_work(|| "world");
//!
//! let sentence = greeting.zip_with(subject, |a, b| format!("{a}, {b}"));
//! assert_eq!(sentence.wait(), "hello, world");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use deferral::prelude::*;
/// ```
pub mod prelude {

    #[cfg(feature = "typeclass")]
    pub use crate::typeclass::*;

    #[cfg(feature = "control")]
    pub use crate::control::*;

    #[cfg(feature = "effect")]
    pub use crate::effect::*;
}

#[cfg(feature = "typeclass")]
pub mod typeclass;

#[cfg(feature = "control")]
pub mod control;

#[cfg(feature = "effect")]
pub mod effect;
