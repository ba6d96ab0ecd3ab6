//! Observation hooks for cache mutations.
//!
//! External monitors subscribe to a [`crate::CacheSet`] through the
//! [`CacheObserver`] trait instead of probing its internals. The engine
//! invokes the callbacks after its internal lock is released, so observers
//! may read the cache again, but the state they see can already be newer
//! than the event they were notified about.
//!
//! Default behavior (if methods are not overridden) logs via the `log`
//! crate.
//!
//! # Example
//!
//! ```ignore
//! use memo_kit::observer::CacheObserver;
//!
//! struct EvictionCounter(std::sync::atomic::AtomicUsize);
//!
//! impl CacheObserver<memo_kit::CacheKey> for EvictionCounter {
//!     fn on_evict(&self, _key: &memo_kit::CacheKey) {
//!         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!     }
//! }
//!
//! // cache.observe(Box::new(EvictionCounter(Default::default())));
//! ```

use std::fmt::Debug;

/// Trait for observing cache mutations.
///
/// All methods have no-op-by-default logging implementations; override only
/// what you need.
pub trait CacheObserver<K: Debug>: Send + Sync {
    /// A new entry was inserted (or an existing key overwritten).
    fn on_insert(&self, key: &K) {
        debug!("Cache observer: INSERT {:?}", key);
    }

    /// An entry was evicted by the capacity policy.
    fn on_evict(&self, key: &K) {
        debug!("Cache observer: EVICT {:?}", key);
    }

    /// An entry was removed by a lazy expiration sweep.
    fn on_expire(&self, key: &K) {
        debug!("Cache observer: EXPIRE {:?}", key);
    }

    /// An entry was removed by an explicit delete.
    fn on_remove(&self, key: &K) {
        debug!("Cache observer: REMOVE {:?}", key);
    }

    /// The whole store was cleared.
    fn on_clear(&self) {
        debug!("Cache observer: CLEAR");
    }
}

/// Mutation notices queued under the engine lock, delivered after release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Notice<K> {
    Insert(K),
    Evict(K),
    Expire(K),
    Remove(K),
    Clear,
}

impl<K: Debug> Notice<K> {
    pub(crate) fn deliver(&self, observer: &dyn CacheObserver<K>) {
        match self {
            Notice::Insert(key) => observer.on_insert(key),
            Notice::Evict(key) => observer.on_evict(key),
            Notice::Expire(key) => observer.on_expire(key),
            Notice::Remove(key) => observer.on_remove(key),
            Notice::Clear => observer.on_clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        inserts: AtomicUsize,
        clears: AtomicUsize,
    }

    impl CacheObserver<u32> for Counter {
        fn on_insert(&self, _key: &u32) {
            self.inserts.fetch_add(1, Ordering::Relaxed);
        }

        fn on_clear(&self) {
            self.clears.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_notice_dispatch() {
        let counter = Counter {
            inserts: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        };

        Notice::Insert(1u32).deliver(&counter);
        Notice::Insert(2u32).deliver(&counter);
        Notice::Clear.deliver(&counter);
        // Unoverridden methods fall back to logging.
        Notice::Evict(3u32).deliver(&counter);

        assert_eq!(counter.inserts.load(Ordering::Relaxed), 2);
        assert_eq!(counter.clears.load(Ordering::Relaxed), 1);
    }
}
