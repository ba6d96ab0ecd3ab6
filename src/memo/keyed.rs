//! The full keyed memoization strategy.

use crate::cache::{CacheEntry, CacheSet, CacheValue};
use crate::error::Result;
use crate::key::CacheKey;
use crate::memo::{into_cache_value, Computed, ComputeFn};
use crate::resolver::KeyResolver;
use std::sync::Arc;

/// A computation memoized over a bounded, recency-ordered [`CacheSet`].
///
/// Each call resolves the arguments to a [`CacheKey`]; a live entry under
/// that key is returned without invoking the computation, otherwise the
/// computation runs and its result is stored. The cache's capacity,
/// expiration and pending-value behavior all apply (see [`CacheSet`]).
///
/// Cloning is cheap and clones share the cache and the computation.
pub struct MemoCache<A, V> {
    compute: Arc<ComputeFn<A, V>>,
    resolver: Arc<dyn KeyResolver<A>>,
    cache: CacheSet<CacheKey, V>,
}

impl<A, V> Clone for MemoCache<A, V> {
    fn clone(&self) -> Self {
        MemoCache {
            compute: Arc::clone(&self.compute),
            resolver: Arc::clone(&self.resolver),
            cache: self.cache.clone(),
        }
    }
}

impl<A, V> MemoCache<A, V> {
    pub(crate) fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.compute, &other.compute)
    }
}

impl<A, V> MemoCache<A, V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        compute: Arc<ComputeFn<A, V>>,
        resolver: Arc<dyn KeyResolver<A>>,
        cache: CacheSet<CacheKey, V>,
    ) -> Self {
        MemoCache {
            compute,
            resolver,
            cache,
        }
    }

    /// The backing cache handle.
    pub fn cache(&self) -> &CacheSet<CacheKey, V> {
        &self.cache
    }

    fn store(&self, key: CacheKey, computed: Computed<V>) -> CacheEntry<CacheKey, V> {
        self.cache.set_value(key, into_cache_value(computed))
    }

    /// Invoke through the cache: return the stored value on a hit, compute
    /// and store on a miss.
    ///
    /// A resolver or computation error propagates and nothing is written.
    pub fn call(&self, args: &A) -> Result<CacheValue<V>> {
        Ok(self.get_item(args)?.value)
    }

    /// Invoke through the cache and return the full entry, timestamps
    /// included.
    pub fn get_item(&self, args: &A) -> Result<CacheEntry<CacheKey, V>> {
        let key = self.resolver.resolve(args)?;
        if let Some(entry) = self.cache.get(&key) {
            debug!("✓ Memo hit for key {}", key);
            return Ok(entry);
        }
        debug!("✗ Memo miss for key {}, computing", key);
        let computed = (self.compute)(args)?;
        Ok(self.store(key, computed))
    }

    /// Invoke the computation directly: no cache read, no cache write, no
    /// usage bump. Existing entries are untouched.
    pub fn skip_cache(&self, args: &A) -> Result<CacheValue<V>> {
        Ok(into_cache_value((self.compute)(args)?))
    }

    /// Recompute unconditionally and overwrite the entry, even when a live
    /// value is cached.
    pub fn refresh(&self, args: &A) -> Result<CacheValue<V>> {
        Ok(self.refresh_item(args)?.value)
    }

    /// [`refresh`](Self::refresh), returning the full overwritten entry.
    pub fn refresh_item(&self, args: &A) -> Result<CacheEntry<CacheKey, V>> {
        let key = self.resolver.resolve(args)?;
        debug!("Refreshing key {}", key);
        let computed = (self.compute)(args)?;
        Ok(self.store(key, computed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::error::Error;
    use crate::memo::{memo_cache, CacheMemoOptions, MemoTarget};
    use crate::resolver::FnResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted_square() -> (Arc<AtomicUsize>, MemoTarget<(i64,), i64>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let target = MemoTarget::of(move |args: &(i64,)| {
            seen.fetch_add(1, Ordering::SeqCst);
            args.0 * args.0
        });
        (calls, target)
    }

    #[test]
    fn test_hit_skips_the_computation() {
        let (calls, target) = counted_square();
        let memo = memo_cache(target, CacheMemoOptions::default()).unwrap();

        assert_eq!(memo.call(&(3,)).unwrap().ready(), Some(9));
        assert_eq!(memo.call(&(3,)).unwrap().ready(), Some(9));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(memo.call(&(4,)).unwrap().ready(), Some(16));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_skip_cache_neither_reads_nor_writes() {
        let (calls, target) = counted_square();
        let memo = memo_cache(target, CacheMemoOptions::default()).unwrap();
        let keyed = memo.as_keyed().unwrap();

        assert_eq!(keyed.skip_cache(&(5,)).unwrap().ready(), Some(25));
        assert!(keyed.cache().is_empty());

        // A later cached call still computes: skip_cache wrote nothing.
        assert_eq!(memo.call(&(5,)).unwrap().ready(), Some(25));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // And skip_cache ignores the now-cached value.
        keyed.skip_cache(&(5,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_refresh_recomputes_despite_live_entry() {
        let (calls, target) = counted_square();
        let memo = memo_cache(target, CacheMemoOptions::default()).unwrap();
        let keyed = memo.as_keyed().unwrap();

        memo.call(&(2,)).unwrap();
        assert_eq!(keyed.refresh(&(2,)).unwrap().ready(), Some(4));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The refreshed entry serves subsequent calls.
        memo.call(&(2,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_item_exposes_entry_metadata() {
        let (_, target) = counted_square();
        let memo = memo_cache(target, CacheMemoOptions::default()).unwrap();
        let keyed = memo.as_keyed().unwrap();

        let entry = keyed.get_item(&(6,)).unwrap();
        assert_eq!(entry.key, crate::CacheKey::from("[6]"));
        assert_eq!(entry.value.ready(), Some(36));
        assert!(entry.created_at <= entry.last_usage);
    }

    #[test]
    fn test_resolver_failure_writes_nothing_and_skips_compute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let memo = memo_cache(
            MemoTarget::of(move |args: &(i64,)| {
                seen.fetch_add(1, Ordering::SeqCst);
                args.0
            }),
            CacheMemoOptions::default().with_resolver(FnResolver(
                |_args: &(i64,)| -> Result<crate::CacheKey> {
                    Err(Error::Other("bad key".to_string()))
                },
            )),
        )
        .unwrap();

        let err = memo.call(&(1,)).unwrap_err();
        assert!(matches!(err, Error::ResolverError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(memo.cache().unwrap().is_empty());
    }

    #[test]
    fn test_computation_error_writes_nothing() {
        let memo = memo_cache(
            MemoTarget::of_fallible(|_args: &(i64,)| -> Result<i64> {
                Err(Error::Other("boom".to_string()))
            }),
            CacheMemoOptions::default(),
        )
        .unwrap();

        assert!(memo.call(&(1,)).is_err());
        assert!(memo.cache().unwrap().is_empty());
    }

    #[test]
    fn test_bounded_cache_evicts_under_memoization() {
        let (calls, target) = counted_square();
        let memo = memo_cache(
            target,
            CacheMemoOptions::default().with_cache(CacheOptions::default().with_slots(2)),
        )
        .unwrap();

        memo.call(&(1,)).unwrap();
        memo.call(&(2,)).unwrap();
        memo.call(&(3,)).unwrap(); // evicts the (1,) entry

        memo.call(&(1,)).unwrap(); // recomputes
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
