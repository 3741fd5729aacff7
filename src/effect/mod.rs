//! Effect types.
//!
//! # Synchronous Effects
//!
//! - [`IO`]: a lazy, re-runnable side-effecting computation
//! - [`Reader`]: a computation over a shared environment
//! - [`Writer`]: a result with an accumulated log
//!
//! # Asynchronous Effects (requires `async` feature)
//!
//! - [`Deferred`]: a lazily started computation that delivers one value
//!   through a callback, with explicit cancellation
//! - [`deferred::zip`] and friends: parallel combination with a single-fire
//!   barrier
//!
//! The two worlds meet at [`Deferred::from_io`], [`Deferred::to_io`] and
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
//! Moving an `IO` to a worker and back:
//!
//! ```rust
//! # #[cfg(feature = "async")]
//! # {
//! use deferral::effect::{Deferred, IO};
//!
//! let expensive = IO::new(|| (1..=20u64).product::<u64>() % 1_000_007);
//! let on_worker = Deferred::from_io(expensive.clone());
//! assert_eq!(on_worker.to_io().run_unsafe(), expensive.run_unsafe());
//! # }
//! ```

// =============================================================================
// Synchronous Effects
// =============================================================================

mod io;
mod reader;
mod writer;

pub use io::IO;
pub use reader::Reader;
pub use writer::Writer;

// =============================================================================
// Deferred (requires async feature)
// =============================================================================

#[cfg(feature = "async")]
pub mod deferred;

#[cfg(feature = "async")]
pub use deferred::{CancellationToken, Deferred, DeferredError};
