//! Algebraic type classes.
//!
//! - [`Semigroup`]: types with an associative `combine`
//! - [`Monoid`]: semigroups with an identity element
//!
//! `Writer` accumulates its output through these traits.
//!
//! # Examples
//!
//! ```rust
//! use deferral::typeclass::{Monoid, Semigroup};
//!
//! let value = String::from("hello");
//! assert_eq!(String::empty().combine(value.clone()), value);
//! ```

mod monoid;
mod semigroup;

pub use monoid::Monoid;
pub use semigroup::Semigroup;
