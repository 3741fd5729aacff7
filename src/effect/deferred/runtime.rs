//! Worker runtime shared by every `Deferred`.
//!
//! `Deferred` needs three things from the outside world: submit a closure
//! for asynchronous execution, submit a closure after a delay, and cancel a
//! delayed closure that has not started yet. This module provides them on
//! top of a single tokio runtime.
//!
//! 1. **Global Runtime**: A lazily-initialized multi-thread runtime shared by
//!    all computations. It can be configured once with [`configure`] before
//!    first use; it is never dropped.
//!
//! 2. **Handle Caching**: When called from inside a tokio runtime the current
//!    runtime's handle is used; otherwise a thread-local cached handle to the
//!    global runtime.
//!
//! 3. **Blocking Execution**: [`try_run_blocking`] drives a future from
//!    synchronous code, using `block_in_place` inside a multi-thread runtime
//!    to avoid nested runtime panics.
//!
//! Submitted work runs on the runtime's blocking pool, so long-running
//! closures never stall the timer.
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::deferred::runtime::{run_blocking, submit};
//! use tokio::sync::oneshot;
//!
//! let (sender, receiver) = oneshot::channel();
//! submit(move || {
//!     let _ = sender.send(6 * 7);
//! });
//! assert_eq!(run_blocking(receiver), Ok(42));
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task::AbortHandle;

use super::config::RuntimeConfig;
use super::error::{BlockingError, RuntimeError};

// =============================================================================
// Global Runtime
// =============================================================================

static GLOBAL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn build_runtime(config: &RuntimeConfig) -> Result<Runtime, RuntimeError> {
    config.validate()?;
    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .max_blocking_threads(config.max_blocking_threads())
        .thread_name(config.thread_name())
        .enable_all()
        .build()
        .map_err(|error| RuntimeError::Build(error.to_string()))?;
    tracing::debug!(
        worker_threads = config.worker_threads(),
        max_blocking_threads = config.max_blocking_threads(),
        "built deferral worker runtime"
    );
    Ok(runtime)
}

/// Installs the global runtime with the given configuration.
///
/// Must be called before the first `Deferred` is started (or before the
/// first call to [`global`]).
///
/// # Errors
///
/// - `RuntimeError::AlreadyInitialized` if the runtime already exists.
/// - `RuntimeError::InvalidConfig` if a thread count is zero.
/// - `RuntimeError::Build` if tokio cannot build the runtime.
///
/// # Examples
///
/// ```rust
/// use deferral::effect::deferred::RuntimeConfig;
/// use deferral::effect::deferred::runtime::{configure, global};
///
/// let _ = global();
/// assert!(configure(RuntimeConfig::default()).is_err());
/// ```
pub fn configure(config: RuntimeConfig) -> Result<(), RuntimeError> {
    if GLOBAL_RUNTIME.get().is_some() {
        return Err(RuntimeError::AlreadyInitialized);
    }
    let runtime = build_runtime(&config)?;
    GLOBAL_RUNTIME
        .set(runtime)
        .map_err(|_| RuntimeError::AlreadyInitialized)
}

/// Returns a reference to the global runtime.
///
/// The runtime is created with [`RuntimeConfig::default`] on first call
/// unless [`configure`] installed one earlier.
///
/// # Panics
///
/// Panics if tokio fails to build the default runtime.
#[inline]
#[must_use]
pub fn global() -> &'static Runtime {
    GLOBAL_RUNTIME.get_or_init(|| {
        build_runtime(&RuntimeConfig::default()).expect("Failed to create global tokio runtime")
    })
}

/// Returns `true` once the global runtime exists.
#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL_RUNTIME.get().is_some()
}

// =============================================================================
// Handle Caching
// =============================================================================

thread_local! {
    static CACHED_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Returns a handle to the current or global runtime.
///
/// Inside a tokio runtime this is `Handle::current()`, so work started from
/// async code stays on the caller's runtime. That runtime must have the time
/// driver enabled for delayed work. Outside a runtime it is a cached handle
/// to [`global`].
#[inline]
#[must_use]
pub fn handle() -> Handle {
    if let Ok(current_handle) = Handle::try_current() {
        return current_handle;
    }

    CACHED_HANDLE.with(|cached| {
        cached
            .borrow_mut()
            .get_or_insert_with(|| global().handle().clone())
            .clone()
    })
}

// =============================================================================
// Work Submission
// =============================================================================

/// Runs `work` on the runtime's blocking pool and returns immediately.
///
/// A panic inside `work` is contained by the pool; anything `work` owns is
/// dropped during unwinding.
pub fn submit<F>(work: F)
where
    F: FnOnce() + Send + 'static,
{
    drop(handle().spawn_blocking(work));
}

/// A closure scheduled with [`submit_after`].
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    abort_handle: AbortHandle,
}

impl ScheduledTask {
    /// Stops the timer.
    ///
    /// If the delay has not elapsed yet the closure is dropped without
    /// running. Once the closure has been handed to the blocking pool it
    /// runs to completion.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    /// Returns `true` once the timer task has completed or been aborted.
    pub fn is_finished(&self) -> bool {
        self.abort_handle.is_finished()
    }
}

/// Runs `work` on the blocking pool once `interval` has elapsed.
///
/// The returned [`ScheduledTask`] can abort the timer before it fires.
pub fn submit_after<F>(interval: Duration, work: F) -> ScheduledTask
where
    F: FnOnce() + Send + 'static,
{
    let task = handle().spawn(async move {
        tokio::time::sleep(interval).await;
        if let Err(error) = tokio::task::spawn_blocking(work).await {
            tracing::debug!(%error, "delayed work did not complete");
        }
    });
    ScheduledTask {
        abort_handle: task.abort_handle(),
    }
}

// =============================================================================
// Blocking Execution
// =============================================================================

/// Attempts to execute a future synchronously, blocking the current thread.
///
/// - **Inside a multi-thread runtime**: uses `block_in_place` with the current
///   runtime's handle.
/// - **Inside a current-thread runtime**: returns
///   `Err(BlockingError::CurrentThreadRuntime)`.
/// - **Outside a runtime**: uses the global runtime's `block_on`.
///
/// # Errors
///
/// Returns a `BlockingError` when the calling context cannot block.
///
/// # Examples
///
/// ```rust
/// use deferral::effect::deferred::runtime::try_run_blocking;
///
/// let result = try_run_blocking(async { 42 });
/// assert_eq!(result, Ok(42));
/// ```
#[inline]
pub fn try_run_blocking<F, T>(future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    if let Ok(current_handle) = Handle::try_current() {
        match current_handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
                current_handle.block_on(future)
            })),
            RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
            _ => Err(BlockingError::UnsupportedRuntimeFlavor),
        }
    } else {
        Ok(global().block_on(future))
    }
}

/// Executes a future synchronously, blocking the current thread.
///
/// # Panics
///
/// Panics if called from within a current-thread runtime, or if the future
/// panics.
#[inline]
pub fn run_blocking<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    try_run_blocking(future).expect("run_blocking failed")
}
