//! Monoid - a semigroup with an identity element.
//!
//! # Laws
//!
//! ```text
//! Monoid::empty().combine(a) == a
//! a.combine(Monoid::empty()) == a
//! ```

use super::Semigroup;

/// A [`Semigroup`] with an identity element.
pub trait Monoid: Semigroup {
    /// The identity element.
    fn empty() -> Self;

    /// Folds an iterator, starting from [`empty`](Self::empty).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::typeclass::Monoid;
    ///
    /// let lines = vec![vec!["a"], vec![], vec!["b", "c"]];
    /// assert_eq!(Vec::combine_all(lines), vec!["a", "b", "c"]);
    /// assert_eq!(String::combine_all(Vec::new()), "");
    /// ```
    fn combine_all<I>(iterator: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        Self: Sized,
    {
        iterator.into_iter().fold(Self::empty(), Self::combine)
    }
}

impl Monoid for String {
    fn empty() -> Self {
        Self::new()
    }
}

impl<T> Monoid for Vec<T> {
    fn empty() -> Self {
        Self::new()
    }
}

impl Monoid for () {
    fn empty() -> Self {}
}

impl<T: Semigroup> Monoid for Option<T> {
    fn empty() -> Self {
        None
    }
}
