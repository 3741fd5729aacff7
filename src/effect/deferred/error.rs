//! Error types for deferred computations and the worker runtime.
//!
//! `Deferred` itself carries no failure channel: the payload type is
//! unconstrained and callers that need failures instantiate it with
//! `Result` or `Option`. The errors here describe what can go wrong
//! *around* a computation: waiting on it from a synchronous context,
//! or configuring the shared runtime it runs on.

use thiserror::Error;

// =============================================================================
// DeferredError
// =============================================================================

/// Errors observed when bridging a `Deferred` back to synchronous or async code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// The computation was cancelled and its completion callback was dropped
    /// without ever being invoked.
    #[error("deferred computation was cancelled before delivering a value")]
    Cancelled,

    /// The completion callback was dropped without a value while no
    /// cancellation was requested (for example, the work panicked).
    #[error("deferred computation dropped its completion callback without a value")]
    Abandoned,

    /// The calling context does not allow blocking on the result.
    #[error(transparent)]
    Blocking(#[from] BlockingError),
}

// =============================================================================
// BlockingError
// =============================================================================

/// Error type for blocking execution failures.
///
/// Returned when `try_run_blocking` cannot drive a future to completion
/// from the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockingError {
    /// Cannot use `block_in_place` in a current-thread runtime.
    #[error(
        "cannot execute blocking operation in current-thread runtime: \
         block_in_place is only supported in multi-thread runtimes"
    )]
    CurrentThreadRuntime,

    /// The runtime flavor is not supported for blocking execution.
    ///
    /// Kept for forward compatibility with runtime flavors tokio may add.
    #[error(
        "cannot execute blocking operation: \
         the runtime flavor is not supported for blocking execution"
    )]
    UnsupportedRuntimeFlavor,
}

// =============================================================================
// Configuration and Runtime Errors
// =============================================================================

/// A runtime configuration value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// The environment variable name.
        key: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// A thread count was set to zero.
    #[error("{field} must be greater than 0")]
    ZeroThreads {
        /// The offending configuration field.
        field: &'static str,
    },
}

/// Errors raised while installing the shared worker runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The global runtime was already created, either by an earlier
    /// `configure` call or by first use with the default configuration.
    #[error("the global runtime has already been initialized")]
    AlreadyInitialized,

    /// The supplied configuration is invalid.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// tokio failed to build the runtime.
    #[error("failed to build the worker runtime: {0}")]
    Build(String),
}
