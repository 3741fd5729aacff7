//! Writer Monad - computations that accumulate a log.
//!
//! A `Writer<W, A>` pairs a result `A` with an output `W`. Sequencing two
//! writers combines their outputs with
//! [`Semigroup::combine`](crate::typeclass::Semigroup::combine), so the
//! output type must be a [`Monoid`] (the empty output is the starting point).
//!
//! Unlike [`Reader`](super::Reader) and [`IO`](super::IO), a `Writer` is
//! strict: its result and output are plain values computed eagerly.
//!
//! # Laws
//!
//! - Left Identity: `Writer::pure(a).flat_map(f) == f(a)`
//! - Right Identity: `m.flat_map(Writer::pure) == m`
//! - Tell Combination: `tell(w1).then(tell(w2)) == tell(w1.combine(w2))`
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::Writer;
//!
//! fn half(value: i32) -> Writer<Vec<String>, i32> {
//!     Writer::new(value / 2, vec![format!("halved {value}")])
//! }
//!
//! let (result, log) = half(40).flat_map(half).run();
//! assert_eq!(result, 10);
//! assert_eq!(log, vec!["halved 40", "halved 20"]);
//! ```

use crate::typeclass::Monoid;

/// A result together with accumulated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Writer<W, A>
where
    W: Monoid,
{
    result: A,
    output: W,
}

impl<W, A> Writer<W, A>
where
    W: Monoid,
{
    /// Creates a writer from a result and its output.
    pub const fn new(result: A, output: W) -> Self {
        Self { result, output }
    }

    /// A writer with an empty output.
    pub fn pure(value: A) -> Self {
        Self::new(value, W::empty())
    }

    /// Splits the writer into its result and output.
    pub fn run(self) -> (A, W) {
        (self.result, self.output)
    }

    /// The result, discarding the output.
    pub fn eval(self) -> A {
        self.result
    }

    /// The output, discarding the result.
    pub fn exec(self) -> W {
        self.output
    }

    /// Maps the result, keeping the output.
    pub fn fmap<B, F>(self, function: F) -> Writer<W, B>
    where
        F: FnOnce(A) -> B,
    {
        Writer::new(function(self.result), self.output)
    }

    /// Chains a writer computed from the result; the outputs are combined in order.
    pub fn flat_map<B, F>(self, function: F) -> Writer<W, B>
    where
        F: FnOnce(A) -> Writer<W, B>,
    {
        let next = function(self.result);
        Writer::new(next.result, self.output.combine(next.output))
    }

    /// Alias for [`flat_map`](Self::flat_map).
    pub fn and_then<B, F>(self, function: F) -> Writer<W, B>
    where
        F: FnOnce(A) -> Writer<W, B>,
    {
        self.flat_map(function)
    }

    /// Keeps `next`'s result and both outputs.
    #[must_use]
    pub fn then<B>(self, next: Writer<W, B>) -> Writer<W, B> {
        Writer::new(next.result, self.output.combine(next.output))
    }

    /// Combines two results; outputs are combined left to right.
    pub fn map2<B, C, F>(self, other: Writer<W, B>, function: F) -> Writer<W, C>
    where
        F: FnOnce(A, B) -> C,
    {
        Writer::new(
            function(self.result, other.result),
            self.output.combine(other.output),
        )
    }

    /// Pairs two results.
    #[must_use]
    pub fn product<B>(self, other: Writer<W, B>) -> Writer<W, (A, B)> {
        self.map2(other, |a, b| (a, b))
    }

    /// Exposes the output alongside the result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::Writer;
    ///
    /// let writer: Writer<String, i32> = Writer::new(1, "one".to_string());
    /// let ((result, seen), output) = Writer::listen(writer).run();
    /// assert_eq!((result, seen.as_str(), output.as_str()), (1, "one", "one"));
    /// ```
    pub fn listen(computation: Self) -> Writer<W, (A, W)>
    where
        W: Clone,
    {
        let seen = computation.output.clone();
        Writer::new((computation.result, seen), computation.output)
    }

    /// Rewrites the output of `computation`.
    pub fn censor<F>(modifier: F, computation: Self) -> Self
    where
        F: FnOnce(W) -> W,
    {
        Self::new(computation.result, modifier(computation.output))
    }
}

impl<W> Writer<W, ()>
where
    W: Monoid,
{
    /// Records `output` with no result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::Writer;
    ///
    /// let log = Writer::tell(vec!["start"])
    ///     .then(Writer::tell(vec!["finish"]))
    ///     .exec();
    /// assert_eq!(log, vec!["start", "finish"]);
    /// ```
    pub const fn tell(output: W) -> Self {
        Self::new((), output)
    }
}

impl<W, A> std::fmt::Display for Writer<W, A>
where
    W: Monoid,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "<Writer>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pure_has_empty_output() {
        let writer: Writer<String, i32> = Writer::pure(3);
        assert_eq!(writer.run(), (3, String::new()));
    }

    #[rstest]
    fn flat_map_combines_outputs_in_order() {
        let writer = Writer::new(2, vec![1]).flat_map(|x| Writer::new(x * 10, vec![2, 3]));
        assert_eq!(writer.run(), (20, vec![1, 2, 3]));
    }

    #[rstest]
    fn map2_combines_left_to_right() {
        let left = Writer::new(1, "a".to_string());
        let right = Writer::new(2, "b".to_string());
        assert_eq!(left.map2(right, |a, b| a + b).run(), (3, "ab".to_string()));
    }

    #[rstest]
    fn censor_rewrites_output() {
        let writer = Writer::new(0, vec!["x", "y"]);
        let censored = Writer::censor(|mut output: Vec<&str>| {
            output.reverse();
            output
        }, writer);
        assert_eq!(censored.exec(), vec!["y", "x"]);
    }

    #[rstest]
    fn unit_output_is_allowed() {
        let writer: Writer<(), &str> = Writer::pure("value");
        assert_eq!(writer.eval(), "value");
    }

    #[rstest]
    fn display() {
        assert_eq!(Writer::<String, i32>::pure(0).to_string(), "<Writer>");
    }
}
