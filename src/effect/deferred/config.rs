//! Configuration for the shared worker runtime.
//!
//! The runtime is created once per process. A `RuntimeConfig` can be
//! installed with [`configure`](super::runtime::configure) before the first
//! `Deferred` is started; otherwise [`RuntimeConfig::default`] is used.
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::deferred::RuntimeConfig;
//!
//! let config = RuntimeConfig::default()
//!     .with_worker_threads(2)
//!     .with_thread_name("my-workers");
//! assert_eq!(config.worker_threads(), 2);
//! assert_eq!(config.thread_name(), "my-workers");
//! ```

use std::env;

use super::error::ConfigError;

/// Environment variable overriding the number of async worker threads.
pub const WORKER_THREADS_ENV: &str = "DEFERRAL_WORKER_THREADS";

/// Environment variable overriding the blocking pool size.
pub const MAX_BLOCKING_THREADS_ENV: &str = "DEFERRAL_MAX_BLOCKING_THREADS";

const DEFAULT_MAX_BLOCKING_THREADS: usize = 512;
const DEFAULT_THREAD_NAME: &str = "deferral-worker";

/// Settings for the global multi-thread runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    worker_threads: usize,
    max_blocking_threads: usize,
    thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Builds a configuration from the process environment.
    ///
    /// Unset variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// [`from_env`](Self::from_env) is this function applied to the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a present value is not a
    /// positive integer.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(WORKER_THREADS_ENV) {
            config.worker_threads = parse_positive(WORKER_THREADS_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_BLOCKING_THREADS_ENV) {
            config.max_blocking_threads = parse_positive(MAX_BLOCKING_THREADS_ENV, &value)?;
        }
        Ok(config)
    }

    /// Sets the number of async worker threads (timers and task polling).
    #[must_use]
    pub const fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Sets the upper bound of the blocking pool that runs submitted work.
    #[must_use]
    pub const fn with_max_blocking_threads(mut self, max_blocking_threads: usize) -> Self {
        self.max_blocking_threads = max_blocking_threads;
        self
    }

    /// Sets the name given to runtime threads.
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Number of async worker threads.
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Upper bound of the blocking pool.
    pub const fn max_blocking_threads(&self) -> usize {
        self.max_blocking_threads
    }

    /// Name given to runtime threads.
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Checks that every thread count is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ZeroThreads` naming the first zero field.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                field: "worker_threads",
            });
        }
        if self.max_blocking_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                field: "max_blocking_threads",
            });
        }
        Ok(())
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
