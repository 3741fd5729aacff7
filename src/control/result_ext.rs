//! Observation and pairing helpers for `Result`.

/// Extension methods for `Result`.
///
/// # Examples
///
/// ```rust
/// use deferral::control::ResultExt;
///
/// let mut seen = Vec::new();
/// let result: Result<i32, String> = Ok(3);
/// let result = result
///     .on_success(|value| seen.push(*value))
///     .on_failure(|error| panic!("unexpected {error}"));
///
/// assert_eq!(result, Ok(3));
/// assert_eq!(seen, vec![3]);
/// ```
pub trait ResultExt<T, E>: Sized {
    /// Runs `observer` on the success value and returns the result unchanged.
    #[must_use]
    fn on_success<F>(self, observer: F) -> Self
    where
        F: FnOnce(&T);

    /// Runs `observer` on the error and returns the result unchanged.
    #[must_use]
    fn on_failure<F>(self, observer: F) -> Self
    where
        F: FnOnce(&E);

    /// Pairs two results, keeping the first error.
    ///
    /// # Errors
    ///
    /// Returns `self`'s error if it is an `Err`, otherwise `other`'s.
    fn concat<U>(self, other: Result<U, E>) -> Result<(T, U), E>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn on_success<F>(self, observer: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Ok(value) = &self {
            observer(value);
        }
        self
    }

    fn on_failure<F>(self, observer: F) -> Self
    where
        F: FnOnce(&E),
    {
        if let Err(error) = &self {
            observer(error);
        }
        self
    }

    fn concat<U>(self, other: Result<U, E>) -> Result<(T, U), E> {
        Ok((self?, other?))
    }
}
