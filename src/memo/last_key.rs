//! The last-key memoization strategy: one remembered resolved key.

use crate::cache::CacheValue;
use crate::error::Result;
use crate::key::CacheKey;
use crate::memo::{into_cache_value, ComputeFn};
use crate::resolver::KeyResolver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A computation memoized over a single remembered key.
///
/// The previous call's resolved key and value form the only cache slot.
/// A call resolving to the same key returns the remembered value; any other
/// key recomputes and replaces the pair. Alternating between two distinct
/// keys therefore recomputes on every call, which is the intended trade for
/// the constant memory footprint.
///
/// No expiration clocks apply; the remembered value lives until the next
/// miss.
pub struct MemoLastKey<A, V> {
    compute: Arc<ComputeFn<A, V>>,
    resolver: Arc<dyn KeyResolver<A>>,
    last: Arc<Mutex<Option<(CacheKey, CacheValue<V>)>>>,
}

impl<A, V> Clone for MemoLastKey<A, V> {
    fn clone(&self) -> Self {
        MemoLastKey {
            compute: Arc::clone(&self.compute),
            resolver: Arc::clone(&self.resolver),
            last: Arc::clone(&self.last),
        }
    }
}

impl<A, V> MemoLastKey<A, V> {
    pub(crate) fn from_parts(
        compute: Arc<ComputeFn<A, V>>,
        resolver: Arc<dyn KeyResolver<A>>,
    ) -> Self {
        MemoLastKey {
            compute,
            resolver,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.last, &other.last)
    }

    fn lock(&self) -> MutexGuard<'_, Option<(CacheKey, CacheValue<V>)>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The remembered key, if any call has completed.
    pub fn last_key(&self) -> Option<CacheKey> {
        self.lock().as_ref().map(|(key, _)| key.clone())
    }
}

impl<A, V: Clone> MemoLastKey<A, V> {
    /// The remembered value, if any call has completed.
    pub fn last_value(&self) -> Option<CacheValue<V>> {
        self.lock().as_ref().map(|(_, value)| value.clone())
    }

    /// Invoke through the single slot.
    ///
    /// The slot is not held locked across the computation; concurrent misses
    /// may both compute, last writer wins.
    pub fn call(&self, args: &A) -> Result<CacheValue<V>> {
        let key = self.resolver.resolve(args)?;
        if let Some((last_key, last_value)) = &*self.lock() {
            if *last_key == key {
                debug!("✓ Last-key hit for {}", key);
                return Ok(last_value.clone());
            }
        }
        debug!("✗ Last-key miss for {}, computing", key);
        let value = into_cache_value((self.compute)(args)?);
        *self.lock() = Some((key, value.clone()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::{memo_last_key, MemoOptions, MemoTarget};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted_double() -> (Arc<AtomicUsize>, MemoTarget<(i64,), i64>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let target = MemoTarget::of(move |args: &(i64,)| {
            seen.fetch_add(1, Ordering::SeqCst);
            args.0 * 2
        });
        (calls, target)
    }

    #[test]
    fn test_repeat_key_hits() {
        let (calls, target) = counted_double();
        let memo = memo_last_key(target, MemoOptions::default()).unwrap();

        assert_eq!(memo.call(&(10,)).unwrap().ready(), Some(20));
        assert_eq!(memo.call(&(10,)).unwrap().ready(), Some(20));
        assert_eq!(memo.call(&(10,)).unwrap().ready(), Some(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alternating_keys_recompute_every_call() {
        let (calls, target) = counted_double();
        let memo = memo_last_key(target, MemoOptions::default()).unwrap();

        memo.call(&(1,)).unwrap();
        memo.call(&(2,)).unwrap();
        memo.call(&(1,)).unwrap();
        memo.call(&(2,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_last_slot_inspection() {
        let (_, target) = counted_double();
        let memo = memo_last_key(target, MemoOptions::default()).unwrap();
        let last = memo.as_last_key().unwrap();

        assert_eq!(last.last_key(), None);
        assert_eq!(last.last_value().and_then(|v| v.ready()), None);

        memo.call(&(21,)).unwrap();
        assert_eq!(last.last_key(), Some(CacheKey::from("[21]")));
        assert_eq!(last.last_value().and_then(|v| v.ready()), Some(42));

        memo.call(&(1,)).unwrap();
        assert_eq!(last.last_key(), Some(CacheKey::from("[1]")));
    }

    #[test]
    fn test_clones_share_the_slot() {
        let (calls, target) = counted_double();
        let memo = memo_last_key(target, MemoOptions::default()).unwrap();
        let other = memo.clone();

        memo.call(&(5,)).unwrap();
        other.call(&(5,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
