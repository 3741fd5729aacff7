//! Cancellation tokens for deferred computations.
//!
//! A [`CancellationToken`] owns an ordered set of cancellation actions.
//! Cancelling the token runs every registered action exactly once; an
//! action registered after cancellation runs immediately on the
//! registering thread. Tokens are shared by reference (`Clone` is an `Arc`
//! clone), which is how combinators such as `map` and `zip` expose the
//! cancellation of the computations they wrap.
//!
//! Cancellation is advisory: an action can only prevent work that has not
//! started yet.
//!
//! [`register`](CancellationToken::register) hands back an [`ActionKey`].
//! Work that finishes on its own passes the key to
//! [`deregister`](CancellationToken::deregister), so a token shared by many
//! starts only holds actions for the work still outstanding.
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::deferred::CancellationToken;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let fired = Arc::new(AtomicUsize::new(0));
//! let token = CancellationToken::new();
//! let counter = Arc::clone(&fired);
//! token.register(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert!(token.cancel());
//! assert!(!token.cancel());
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

/// A boxed cancellation action.
pub type CancelAction = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one registered action on its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey(u64);

#[derive(Default)]
struct Registry {
    next_key: u64,
    actions: SmallVec<[(ActionKey, CancelAction); 2]>,
}

struct TokenState {
    cancelled: AtomicBool,
    registry: Mutex<Registry>,
}

/// A shared, single-fire registry of cancellation actions.
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates an empty, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Creates a token whose cancellation cancels every given token.
    ///
    /// The given tokens are linked, not owned: cancelling one of them
    /// directly does not mark the merged token as cancelled.
    #[must_use]
    pub fn merged<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let merged = Self::new();
        for token in tokens {
            merged.link(token);
        }
        merged
    }

    /// Registers an action to run when the token is cancelled.
    ///
    /// If the token is already cancelled the action runs immediately and
    /// the returned key matches nothing.
    pub fn register<F>(&self, action: F) -> ActionKey
    where
        F: FnOnce() + Send + 'static,
    {
        let key = {
            let mut registry = self.state.registry.lock();
            let key = ActionKey(registry.next_key);
            registry.next_key = registry.next_key.wrapping_add(1);
            if !self.state.cancelled.load(Ordering::Acquire) {
                registry.actions.push((key, Box::new(action)));
                return key;
            }
            key
        };
        action();
        key
    }

    /// Removes a registered action without running it.
    ///
    /// Returns `false` when the action already ran or was removed before.
    pub fn deregister(&self, key: ActionKey) -> bool {
        let removed = {
            let mut registry = self.state.registry.lock();
            registry
                .actions
                .iter()
                .position(|(registered, _)| *registered == key)
                .map(|index| registry.actions.remove(index))
        };
        removed.is_some()
    }

    /// Makes cancelling this token also cancel `child`.
    ///
    /// Returns `None` when `child` is this token.
    pub fn link(&self, child: &Self) -> Option<ActionKey> {
        if Arc::ptr_eq(&self.state, &child.state) {
            return None;
        }
        let child = child.clone();
        Some(self.register(move || {
            child.cancel();
        }))
    }

    /// Cancels the token, running every registered action.
    ///
    /// Returns `true` for the call that performed the cancellation and
    /// `false` for every later call, which does nothing.
    pub fn cancel(&self) -> bool {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let actions = std::mem::take(&mut self.state.registry.lock().actions);
        tracing::debug!(actions = actions.len(), "cancelling deferred computation");
        for (_, action) in actions {
            action();
        }
        true
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Number of actions waiting for cancellation.
    pub fn pending_actions(&self) -> usize {
        self.state.registry.lock().actions.len()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("pending_actions", &self.pending_actions())
            .finish()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
