//! Parallel combination of deferred computations.
//!
//! `zip` starts every branch immediately and delivers one combined value
//! once the last branch has delivered. Branches may complete in any order
//! and on any thread; the combined callback runs on the thread of the
//! last-arriving branch, exactly once.
//!
//! The combined computation carries a token merged from the branches'
//! tokens, so cancelling it cancels every cancellable branch. If any branch
//! never delivers, the combined callback is dropped once every other branch
//! has released it.
//!
//! # Examples
//!
//! ```rust
//! use deferral::effect::deferred::{self, Deferred};
//! use std::time::Duration;
//!
//! let first = Deferred::delayed(Duration::from_millis(50), || 1);
//! let second = Deferred::delayed(Duration::from_millis(10), || 2);
//!
//! // Argument order, not completion order.
//! assert_eq!(deferred::zip(first, second).wait(), (1, 2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Callback, CancellationToken, Deferred};

// =============================================================================
// Barrier
// =============================================================================

/// Collects branch results and fires the combined callback once.
struct ZipBarrier<S, T> {
    remaining: AtomicUsize,
    slots: Mutex<Option<S>>,
    completion: Mutex<Option<Callback<T>>>,
    assemble: fn(S) -> Option<T>,
}

impl<S, T> ZipBarrier<S, T> {
    fn new(branches: usize, slots: S, completion: Callback<T>, assemble: fn(S) -> Option<T>) -> Self {
        Self {
            remaining: AtomicUsize::new(branches),
            slots: Mutex::new(Some(slots)),
            completion: Mutex::new(Some(completion)),
            assemble,
        }
    }

    /// Stores one branch result; the last arrival assembles and delivers.
    fn arrive<W>(&self, write: W)
    where
        W: FnOnce(&mut S),
    {
        if let Some(slots) = self.slots.lock().as_mut() {
            write(slots);
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let Some(slots) = self.slots.lock().take() else {
            return;
        };
        let Some(completion) = self.completion.lock().take() else {
            return;
        };
        match (self.assemble)(slots) {
            Some(combined) => completion(combined),
            None => tracing::error!("zip barrier completed with an empty slot"),
        }
    }
}

fn merge_tokens<'a, I>(tokens: I) -> Option<CancellationToken>
where
    I: IntoIterator<Item = Option<&'a CancellationToken>>,
{
    let present: SmallVec<[&CancellationToken; 4]> = tokens.into_iter().flatten().collect();
    (!present.is_empty()).then(|| CancellationToken::merged(present))
}

// =============================================================================
// Fixed Arity
// =============================================================================

macro_rules! define_zip {
    ($name:ident, $arity:literal; $($branch:ident: $type:ident @ $index:tt),+) => {
        paste::paste! {
            #[doc = concat!("Runs ", stringify!($arity), " computations in parallel and delivers their values as a tuple.")]
            ///
            /// Values appear in argument order regardless of completion order.
            pub fn $name<$($type),+>($($branch: Deferred<$type>),+) -> Deferred<($($type,)+)>
            where
                $($type: Send + 'static,)+
            {
                let cancellation = merge_tokens([$($branch.cancellation_token()),+]);
                Deferred::from_parts(
                    move |completion: Callback<($($type,)+)>| {
                        let barrier = Arc::new(ZipBarrier::new(
                            $arity,
                            <($(Option<$type>,)+)>::default(),
                            completion,
                            |slots: ($(Option<$type>,)+)| Some(($(slots.$index?,)+)),
                        ));
                        $(
                            let arrival = Arc::clone(&barrier);
                            $branch.start(move |value| arrival.arrive(|slots| slots.$index = Some(value)));
                        )+
                    },
                    cancellation,
                )
            }

            #[doc = concat!("Runs ", stringify!($arity), " computations in parallel and combines their values with `function`.")]
            pub fn [<$name _with>]<$($type,)+ Output, F>(
                function: F,
                $($branch: Deferred<$type>),+
            ) -> Deferred<Output>
            where
                $($type: Send + 'static,)+
                Output: Send + 'static,
                F: Fn($($type),+) -> Output + Send + Sync + 'static,
            {
                $name($($branch),+).map(move |($($branch,)+)| function($($branch),+))
            }
        }
    };
}

define_zip!(zip, 2; first: A @ 0, second: B @ 1);
define_zip!(zip3, 3; first: A @ 0, second: B @ 1, third: C @ 2);
define_zip!(zip4, 4; first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3);
define_zip!(zip5, 5; first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4);
define_zip!(
    zip6, 6;
    first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4, sixth: G @ 5
);
define_zip!(
    zip7, 7;
    first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4, sixth: G @ 5,
    seventh: H @ 6
);
define_zip!(
    zip8, 8;
    first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4, sixth: G @ 5,
    seventh: H @ 6, eighth: I @ 7
);
define_zip!(
    zip9, 9;
    first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4, sixth: G @ 5,
    seventh: H @ 6, eighth: I @ 7, ninth: J @ 8
);
define_zip!(
    zip10, 10;
    first: A @ 0, second: B @ 1, third: C @ 2, fourth: D @ 3, fifth: E @ 4, sixth: G @ 5,
    seventh: H @ 6, eighth: I @ 7, ninth: J @ 8, tenth: K @ 9
);

// =============================================================================
// Dynamic Arity
// =============================================================================

/// Runs every computation in parallel and collects their values in input order.
///
/// An empty input delivers an empty vector synchronously.
///
/// # Examples
///
/// ```rust
/// use deferral::effect::deferred::{Deferred, zip_all};
///
/// let squares = zip_all((1..=4).map(|n| Deferred::from_work(move || n * n)));
/// assert_eq!(squares.wait(), vec![1, 4, 9, 16]);
/// ```
pub fn zip_all<A, I>(deferreds: I) -> Deferred<Vec<A>>
where
    A: Send + 'static,
    I: IntoIterator<Item = Deferred<A>>,
{
    let branches: Arc<[Deferred<A>]> = deferreds.into_iter().collect();
    let cancellation = merge_tokens(branches.iter().map(Deferred::cancellation_token));
    Deferred::from_parts(
        move |completion: Callback<Vec<A>>| {
            if branches.is_empty() {
                completion(Vec::new());
                return;
            }
            let slots: Vec<Option<A>> =
                std::iter::repeat_with(|| None).take(branches.len()).collect();
            let barrier = Arc::new(ZipBarrier::new(
                branches.len(),
                slots,
                completion,
                |slots: Vec<Option<A>>| slots.into_iter().collect(),
            ));
            for (index, branch) in branches.iter().enumerate() {
                let arrival = Arc::clone(&barrier);
                branch.start(move |value| arrival.arrive(|slots| slots[index] = Some(value)));
            }
        },
        cancellation,
    )
}
