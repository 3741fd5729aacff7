//! Reader Monad - computations over a shared environment.
//!
//! A `Reader<R, A>` wraps a function `R -> A`. Composing readers threads the
//! same environment through every step, which makes `Reader` a lightweight
//! form of dependency injection: configuration, handles or clients are
//! supplied once, at [`Reader::run`].
//!
//! # Laws
//!
//! - Functor Identity: `reader.fmap(|x| x) == reader`
//! - Functor Composition: `reader.fmap(f).fmap(g) == reader.fmap(|x| g(f(x)))`
//! - Left Identity: `Reader::pure(a).flat_map(f) == f(a)`
//! - Right Identity: `m.flat_map(Reader::pure) == m`
//! - Ask Retrieval: `Reader::ask().run(r) == r`
//! - Local Identity: `Reader::local(|r| r, m) == m`
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::Reader;
//!
//! #[derive(Clone)]
//! struct Settings {
//!     host: String,
//!     port: u16,
//! }
//!
//! let host = Reader::asks(|settings: Settings| settings.host);
//! let port = Reader::asks(|settings: Settings| settings.port);
//! let address = host.zip_with(port, |host, port| format!("{host}:{port}"));
//!
//! let settings = Settings { host: "localhost".into(), port: 8080 };
//! assert_eq!(address.run(settings), "localhost:8080");
//! ```

use std::fmt;
use std::rc::Rc;

/// A computation that reads from an environment of type `R`.
pub struct Reader<R, A>
where
    R: 'static,
    A: 'static,
{
    run_function: Rc<dyn Fn(R) -> A>,
}

macro_rules! define_reader_zip {
    ($name:ident; $($other:ident: $type:ident),+) => {
        paste::paste! {
            /// Runs this reader and each argument against the same environment
            /// and tuples the results.
            pub fn $name<$($type: 'static),+>(
                self,
                $($other: Reader<R, $type>),+
            ) -> Reader<R, (A, $($type),+)>
            where
                R: Clone,
            {
                Reader::new(move |environment: R| {
                    (self.run(environment.clone()), $($other.run(environment.clone())),+)
                })
            }

            /// Runs this reader and each argument against the same environment
            /// and combines the results with `function`.
            pub fn [<$name _with>]<$($type: 'static,)+ Output: 'static, F>(
                self,
                $($other: Reader<R, $type>,)+
                function: F,
            ) -> Reader<R, Output>
            where
                R: Clone,
                F: Fn(A, $($type),+) -> Output + 'static,
            {
                Reader::new(move |environment: R| {
                    function(self.run(environment.clone()), $($other.run(environment.clone())),+)
                })
            }
        }
    };
}

impl<R, A> Reader<R, A>
where
    R: 'static,
    A: 'static,
{
    /// Creates a reader from a function of the environment.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::Reader;
    ///
    /// let reader: Reader<i32, i32> = Reader::new(|environment| environment * 2);
    /// assert_eq!(reader.run(21), 42);
    /// assert_eq!(reader.run(5), 10);
    /// ```
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(R) -> A + 'static,
    {
        Self {
            run_function: Rc::new(function),
        }
    }

    /// Supplies the environment and computes the result.
    pub fn run(&self, environment: R) -> A {
        (self.run_function)(environment)
    }

    /// A reader that ignores the environment.
    pub fn pure(value: A) -> Self
    where
        A: Clone,
    {
        Self::new(move |_| value.clone())
    }

    /// Maps a function over the result.
    pub fn fmap<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> B + 'static,
        B: 'static,
    {
        Reader::new(move |environment| function(self.run(environment)))
    }

    /// Adapts the reader to a different environment type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::Reader;
    ///
    /// let length: Reader<String, usize> = Reader::new(|text: String| text.len());
    /// let from_number: Reader<u32, usize> = length.contra_map(|n: u32| n.to_string());
    /// assert_eq!(from_number.run(12345), 5);
    /// ```
    pub fn contra_map<Outer, F>(self, function: F) -> Reader<Outer, A>
    where
        F: Fn(Outer) -> R + 'static,
        Outer: 'static,
    {
        Reader::new(move |environment| self.run(function(environment)))
    }

    /// Chains a reader that depends on this one's result.
    pub fn flat_map<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> Reader<R, B> + 'static,
        B: 'static,
        R: Clone,
    {
        Reader::new(move |environment: R| function(self.run(environment.clone())).run(environment))
    }

    /// Alias for [`flat_map`](Self::flat_map).
    pub fn and_then<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> Reader<R, B> + 'static,
        B: 'static,
        R: Clone,
    {
        self.flat_map(function)
    }

    /// Runs this reader for nothing, then `next`, against the same environment.
    #[must_use]
    pub fn then<B>(self, next: Reader<R, B>) -> Reader<R, B>
    where
        B: 'static,
        R: Clone,
    {
        Reader::new(move |environment: R| {
            self.run(environment.clone());
            next.run(environment)
        })
    }

    /// Alias for [`zip_with`](Self::zip_with).
    pub fn map2<B, C, F>(self, other: Reader<R, B>, function: F) -> Reader<R, C>
    where
        F: Fn(A, B) -> C + 'static,
        B: 'static,
        C: 'static,
        R: Clone,
    {
        self.zip_with(other, function)
    }

    /// Alias for [`zip`](Self::zip).
    #[must_use]
    pub fn product<B>(self, other: Reader<R, B>) -> Reader<R, (A, B)>
    where
        B: 'static,
        R: Clone,
    {
        self.zip(other)
    }

    define_reader_zip!(zip; second: B);
    define_reader_zip!(zip3; second: B, third: C);
    define_reader_zip!(zip4; second: B, third: C, fourth: D);
    define_reader_zip!(zip5; second: B, third: C, fourth: D, fifth: E);
    define_reader_zip!(zip6; second: B, third: C, fourth: D, fifth: E, sixth: G);
    define_reader_zip!(zip7; second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H);
    define_reader_zip!(
        zip8;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I
    );
    define_reader_zip!(
        zip9;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I, ninth: J
    );
    define_reader_zip!(
        zip10;
        second: B, third: C, fourth: D, fifth: E, sixth: G, seventh: H, eighth: I, ninth: J,
        tenth: K
    );

    /// A reader that projects a value out of the environment.
    pub fn asks<F>(projection: F) -> Self
    where
        F: Fn(R) -> A + 'static,
    {
        Self::new(projection)
    }

    /// Runs `computation` against an environment rewritten by `modifier`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferral::effect::Reader;
    ///
    /// let doubled: Reader<i32, i32> = Reader::new(|environment| environment * 2);
    /// let shifted = Reader::local(|environment| environment + 10, doubled);
    /// assert_eq!(shifted.run(5), 30);
    /// ```
    pub fn local<F>(modifier: F, computation: Self) -> Self
    where
        F: Fn(R) -> R + 'static,
    {
        Self::new(move |environment| computation.run(modifier(environment)))
    }
}

impl<Env> Reader<Env, Env>
where
    Env: 'static,
{
    /// A reader that returns the environment itself.
    #[must_use]
    pub fn ask() -> Self {
        Self::new(|environment| environment)
    }
}

impl<R, A> Clone for Reader<R, A>
where
    R: 'static,
    A: 'static,
{
    fn clone(&self) -> Self {
        Self {
            run_function: Rc::clone(&self.run_function),
        }
    }
}

impl<R, A> fmt::Display for Reader<R, A>
where
    R: 'static,
    A: 'static,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "<Reader>")
    }
}
