//! The last-reference memoization strategy: one remembered argument list.

use crate::cache::CacheValue;
use crate::error::Result;
use crate::memo::{into_cache_value, ComputeFn};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A computation memoized over the previous call's arguments.
///
/// No resolver and no key text: the argument list itself is remembered and
/// the next call compares against it positionally with `PartialEq`. Equal
/// arguments return the remembered value; anything else recomputes and
/// replaces the pair.
///
/// Equality is whatever `A`'s `PartialEq` says. For by-identity comparison
/// of a large or non-comparable argument, pass it as an [`ArgRef`], whose
/// equality is pointer identity.
pub struct MemoLastRef<A, V> {
    compute: Arc<ComputeFn<A, V>>,
    last: Arc<Mutex<Option<(A, CacheValue<V>)>>>,
}

impl<A, V> Clone for MemoLastRef<A, V> {
    fn clone(&self) -> Self {
        MemoLastRef {
            compute: Arc::clone(&self.compute),
            last: Arc::clone(&self.last),
        }
    }
}

impl<A, V> MemoLastRef<A, V> {
    pub(crate) fn from_parts(compute: Arc<ComputeFn<A, V>>) -> Self {
        MemoLastRef {
            compute,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.last, &other.last)
    }

    fn lock(&self) -> MutexGuard<'_, Option<(A, CacheValue<V>)>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Clone, V> MemoLastRef<A, V> {
    /// The remembered argument list, if any call has completed.
    pub fn last_args(&self) -> Option<A> {
        self.lock().as_ref().map(|(args, _)| args.clone())
    }
}

impl<A, V: Clone> MemoLastRef<A, V> {
    /// The remembered value, if any call has completed.
    pub fn last_value(&self) -> Option<CacheValue<V>> {
        self.lock().as_ref().map(|(_, value)| value.clone())
    }
}

impl<A: Clone + PartialEq, V: Clone> MemoLastRef<A, V> {
    /// Invoke through the single slot.
    ///
    /// The slot is not held locked across the computation; concurrent misses
    /// may both compute, last writer wins.
    pub fn call(&self, args: &A) -> Result<CacheValue<V>> {
        if let Some((last_args, last_value)) = &*self.lock() {
            if last_args == args {
                debug!("✓ Last-ref hit");
                return Ok(last_value.clone());
            }
        }
        debug!("✗ Last-ref miss, computing");
        let value = into_cache_value((self.compute)(args)?);
        *self.lock() = Some((args.clone(), value.clone()));
        Ok(value)
    }
}

/// A shared argument compared by pointer identity.
///
/// Two `ArgRef`s are equal only when they point at the same allocation, so
/// a structurally identical but separately built argument counts as a miss.
/// Cloning shares the allocation and preserves identity.
///
/// # Example
///
/// ```rust
/// use memo_kit::ArgRef;
///
/// let a = ArgRef::new(vec![1, 2, 3]);
/// let same = a.clone();
/// let lookalike = ArgRef::new(vec![1, 2, 3]);
///
/// assert_eq!(a, same);
/// assert_ne!(a, lookalike);
/// ```
pub struct ArgRef<T>(Arc<T>);

impl<T> ArgRef<T> {
    pub fn new(value: T) -> Self {
        ArgRef(Arc::new(value))
    }
}

impl<T> Clone for ArgRef<T> {
    fn clone(&self) -> Self {
        ArgRef(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for ArgRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ArgRef<T> {}

impl<T> Deref for ArgRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<Arc<T>> for ArgRef<T> {
    fn from(value: Arc<T>) -> Self {
        ArgRef(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for ArgRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgRef").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::{memo_last_ref, MemoTarget};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_equal_arguments_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let memo = memo_last_ref(MemoTarget::of(move |args: &(i64, i64)| {
            seen.fetch_add(1, Ordering::SeqCst);
            args.0 + args.1
        }))
        .unwrap();

        assert_eq!(memo.call(&(2, 3)).unwrap().ready(), Some(5));
        assert_eq!(memo.call(&(2, 3)).unwrap().ready(), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(memo.call(&(3, 2)).unwrap().ready(), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_identity_comparison_through_arg_ref() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let memo = memo_last_ref(MemoTarget::of(move |args: &(ArgRef<Vec<i64>>,)| {
            seen.fetch_add(1, Ordering::SeqCst);
            args.0.iter().sum::<i64>()
        }))
        .unwrap();

        let data = ArgRef::new(vec![1, 2, 3]);
        assert_eq!(memo.call(&(data.clone(),)).unwrap().ready(), Some(6));
        assert_eq!(memo.call(&(data.clone(),)).unwrap().ready(), Some(6));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same contents, different allocation: a miss.
        let lookalike = ArgRef::new(vec![1, 2, 3]);
        assert_eq!(memo.call(&(lookalike,)).unwrap().ready(), Some(6));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_last_slot_inspection() {
        let memo = memo_last_ref(MemoTarget::of(|args: &(i64,)| args.0 * 10)).unwrap();
        let last = memo.as_last_ref().unwrap();

        assert_eq!(last.last_args(), None);

        memo.call(&(4,)).unwrap();
        assert_eq!(last.last_args(), Some((4,)));
        assert_eq!(last.last_value().and_then(|v| v.ready()), Some(40));
    }

    #[test]
    fn test_alternating_arguments_recompute_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let memo = memo_last_ref(MemoTarget::of(move |args: &(i64,)| {
            seen.fetch_add(1, Ordering::SeqCst);
            args.0
        }))
        .unwrap();

        memo.call(&(1,)).unwrap();
        memo.call(&(2,)).unwrap();
        memo.call(&(1,)).unwrap();
        memo.call(&(2,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
