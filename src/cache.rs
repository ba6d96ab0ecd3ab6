//! Bounded, recency-ordered cache with dual expiration clocks.
//!
//! [`CacheSet`] is the storage engine behind the keyed memoization strategy
//! and is usable on its own. It keeps at most `slots` entries, evicts the
//! least-recently-touched entries first, and expires entries on two
//! independent clocks:
//!
//! - **Idle timeout (`ttl`)**: time since the entry was last read or written.
//! - **Age timeout (`max_age`)**: time since the entry was created.
//!
//! Either clock elapsing makes an entry logically absent. The same two
//! clocks also apply to the store as a whole: if no key was touched within
//! `ttl`, or nothing was written within `max_age`, the next access clears
//! everything. Expiration is reconciled lazily on access; there is no
//! background sweep and no timer thread.
//!
//! A `CacheSet` is `Clone`, and clones share one store (the handle wraps an
//! `Arc`), which is also how a cache is explicitly shared between several
//! memoized functions.
//!
//! # Pending values
//!
//! A stored value is either ready or a pending asynchronous result (a shared
//! future). With `keep_promises` disabled, storing a pending value registers
//! a continuation that overwrites the entry in place once the future
//! settles. The continuation is guarded by a per-write ticket: if the entry
//! was evicted, deleted or overwritten in the meantime, the settled value is
//! dropped rather than resurrecting stale data.
//!
//! # Example
//!
//! ```rust
//! use memo_kit::{CacheOptions, CacheSet};
//!
//! let cache: CacheSet<i64, &str> = CacheSet::new(CacheOptions::default().with_slots(2));
//!
//! cache.set(1, "one");
//! cache.set(2, "two");
//! cache.set(3, "three");
//!
//! // Capacity 2: the least-recently-touched key was evicted.
//! assert!(cache.get_value(&1).is_none());
//! assert_eq!(cache.get_value(&2).and_then(|v| v.ready()), Some("two"));
//! assert_eq!(cache.get_value(&3).and_then(|v| v.ready()), Some("three"));
//! ```

use crate::observer::{CacheObserver, Notice};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default number of slots when none is configured.
pub const DEFAULT_SLOTS: usize = 8;

/// A pending asynchronous result: a cloneable handle to one shared
/// computation.
pub type SharedFuture<V> = Shared<BoxFuture<'static, V>>;

/// Configuration for a [`CacheSet`].
///
/// Defaults: `slots = 8`, both expiration clocks unbounded, pending values
/// kept as-is (`keep_promises = true`).
#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// Maximum time an entry is kept without being read or written.
    pub ttl: Option<Duration>,

    /// Maximum time an entry is kept since it was created.
    pub max_age: Option<Duration>,

    /// Maximum number of entries; excess is evicted least-recently-touched
    /// first.
    pub slots: usize,

    /// Whether pending values are kept as pending futures (`true`) or
    /// overwritten in place with their resolved value once they settle
    /// (`false`).
    pub keep_promises: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            ttl: None,
            max_age: None,
            slots: DEFAULT_SLOTS,
            keep_promises: true,
        }
    }
}

impl CacheOptions {
    /// Set the idle timeout.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the absolute age timeout.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set the capacity.
    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    /// Control whether pending values stay pending after settlement.
    pub fn with_keep_promises(mut self, keep: bool) -> Self {
        self.keep_promises = keep;
        self
    }
}

/// A stored value: already settled, or still in flight.
#[derive(Clone)]
pub enum CacheValue<V> {
    /// A settled value.
    Ready(V),
    /// A pending asynchronous result. Cloning shares the computation.
    Pending(SharedFuture<V>),
}

impl<V: Clone> CacheValue<V> {
    /// Whether the value is still an in-flight future.
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheValue::Pending(_))
    }

    /// The settled value, if any.
    pub fn ready(&self) -> Option<V> {
        match self {
            CacheValue::Ready(v) => Some(v.clone()),
            CacheValue::Pending(_) => None,
        }
    }

    /// Resolve the value, awaiting it if still pending.
    pub async fn resolved(self) -> V {
        match self {
            CacheValue::Ready(v) => v,
            CacheValue::Pending(shared) => shared.await,
        }
    }
}

impl<V> fmt::Debug for CacheValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Ready(_) => f.write_str("Ready(..)"),
            CacheValue::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// One stored key/value pair plus its timestamps.
///
/// `created_at` is set once, at insertion; `last_usage` is bumped on every
/// successful read and on overwrite.
#[derive(Clone)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: CacheValue<V>,
    pub created_at: Instant,
    pub last_usage: Instant,
    /// Guards asynchronous settlement against evicted or overwritten
    /// entries.
    pub(crate) ticket: u64,
}

impl<K: Debug, V> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("created_at", &self.created_at)
            .field("last_usage", &self.last_usage)
            .finish()
    }
}

struct Inner<K, V> {
    map: HashMap<K, CacheEntry<K, V>>,
    /// Exactly the mapped keys, least- to most-recently-touched.
    usages: Vec<K>,
    last_usage: Option<Instant>,
    last_write: Option<Instant>,
    options: CacheOptions,
    next_ticket: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    /// Move `key` to the most-recently-touched end and bump the store
    /// clocks. Returns the touch time.
    fn touch(&mut self, key: &K, write: bool) -> Instant {
        if let Some(pos) = self.usages.iter().position(|k| k == key) {
            self.usages.remove(pos);
        }
        self.usages.push(key.clone());

        let now = Instant::now();
        if write {
            self.last_write = Some(now);
        }
        self.last_usage = Some(now);
        now
    }

    fn forget(&mut self, key: &K) {
        if let Some(pos) = self.usages.iter().position(|k| k == key) {
            self.usages.remove(pos);
        }
    }

    fn all_expired(&self, now: Instant) -> bool {
        if self.map.is_empty() {
            return false;
        }

        let idle = match (self.options.ttl, self.last_usage) {
            (Some(ttl), Some(at)) => now.duration_since(at) > ttl,
            _ => false,
        };
        let aged = match (self.options.max_age, self.last_write) {
            (Some(max_age), Some(at)) => now.duration_since(at) > max_age,
            _ => false,
        };

        idle || aged
    }

    fn entry_expired(&self, key: &K, now: Instant) -> bool {
        let Some(entry) = self.map.get(key) else {
            return false;
        };

        let idle = self
            .options
            .ttl
            .is_some_and(|ttl| now.duration_since(entry.last_usage) > ttl);
        let aged = self
            .options
            .max_age
            .is_some_and(|max_age| now.duration_since(entry.created_at) > max_age);

        idle || aged
    }

    /// Lazy expiration sweep for one access: whole store first, then the
    /// single entry.
    fn purge(&mut self, key: &K, notices: &mut Vec<Notice<K>>) {
        let now = Instant::now();

        if self.all_expired(now) {
            for k in self.usages.drain(..) {
                notices.push(Notice::Expire(k));
            }
            self.map.clear();
            self.last_usage = None;
            self.last_write = None;
            return;
        }

        if self.entry_expired(key, now) {
            self.map.remove(key);
            self.forget(key);
            notices.push(Notice::Expire(key.clone()));
        }
    }

    fn evict_excess(&mut self, notices: &mut Vec<Notice<K>>) {
        while self.map.len() > self.options.slots && !self.usages.is_empty() {
            let key = self.usages.remove(0);
            self.map.remove(&key);
            notices.push(Notice::Evict(key));
        }
    }
}

/// Bounded, recency-ordered key/value store with dual expiration clocks.
///
/// See the [module documentation](self) for semantics. Clones share one
/// store.
pub struct CacheSet<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    observers: Arc<Mutex<Vec<Arc<dyn CacheObserver<K>>>>>,
}

impl<K, V> Clone for CacheSet<K, V> {
    fn clone(&self) -> Self {
        CacheSet {
            inner: Arc::clone(&self.inner),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<K, V> CacheSet<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache with the given options.
    pub fn new(options: CacheOptions) -> Self {
        CacheSet {
            inner: Arc::new(Mutex::new(Inner {
                map: HashMap::new(),
                usages: Vec::new(),
                last_usage: None,
                last_write: None,
                options,
                next_ticket: 0,
            })),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a cache pre-populated from an iterator of pairs.
    ///
    /// Pairs are written in iteration order, so with more pairs than slots
    /// only the trailing ones survive.
    pub fn with_entries(entries: impl IntoIterator<Item = (K, V)>, options: CacheOptions) -> Self {
        let cache = CacheSet::new(options);
        for (key, value) in entries {
            cache.set(key, value);
        }
        cache
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver queued notices outside the engine lock.
    fn emit(&self, notices: Vec<Notice<K>>) {
        if notices.is_empty() {
            return;
        }

        let observers: Vec<Arc<dyn CacheObserver<K>>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for notice in &notices {
            for observer in &observers {
                notice.deliver(observer.as_ref());
            }
        }
    }

    /// Register an observer notified on insert, evict, expire, remove and
    /// clear.
    pub fn observe(&self, observer: impl CacheObserver<K> + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Whether an unexpired entry exists for `key`.
    ///
    /// Runs the lazy expiration sweep as a side effect, so the store may
    /// shrink.
    pub fn has(&self, key: &K) -> bool {
        let mut notices = Vec::new();
        let present = {
            let mut inner = self.lock_inner();
            inner.purge(key, &mut notices);
            inner.map.contains_key(key)
        };
        self.emit(notices);
        present
    }

    /// Read the full entry for `key`, bumping its recency.
    pub fn get(&self, key: &K) -> Option<CacheEntry<K, V>> {
        let mut notices = Vec::new();
        let result = {
            let mut inner = self.lock_inner();
            inner.purge(key, &mut notices);

            if inner.map.contains_key(key) {
                let now = inner.touch(key, false);
                inner.map.get_mut(key).map(|entry| {
                    entry.last_usage = now;
                    entry.clone()
                })
            } else {
                None
            }
        };
        self.emit(notices);

        if result.is_some() {
            debug!("✓ Cache GET {:?} -> HIT", key);
        } else {
            debug!("✗ Cache GET {:?} -> MISS", key);
        }
        result
    }

    /// Read the value for `key`, bumping its recency.
    pub fn get_value(&self, key: &K) -> Option<CacheValue<V>> {
        self.get(key).map(|entry| entry.value)
    }

    /// Store a settled value under `key`.
    pub fn set(&self, key: K, value: V) -> CacheEntry<K, V> {
        self.set_value(key, CacheValue::Ready(value))
    }

    /// Store a pending asynchronous result under `key`.
    ///
    /// Returns the shared handle so the caller can await the same in-flight
    /// computation that the cache holds.
    pub fn set_pending(
        &self,
        key: K,
        future: impl Future<Output = V> + Send + 'static,
    ) -> SharedFuture<V> {
        let shared = future.boxed().shared();
        self.set_value(key, CacheValue::Pending(shared.clone()));
        shared
    }

    /// Create or overwrite the entry for `key`.
    ///
    /// `created_at` and `last_usage` are both set to now and the key moves
    /// to the most-recently-touched position. Capacity eviction runs after
    /// the write: an over-capacity write is accepted, then the oldest excess
    /// entries are evicted. With `keep_promises` disabled, a pending value
    /// registers its settlement continuation here.
    pub fn set_value(&self, key: K, value: CacheValue<V>) -> CacheEntry<K, V> {
        let mut notices = Vec::new();
        let (entry, settle) = {
            let mut inner = self.lock_inner();
            let now = inner.touch(&key, true);
            let ticket = inner.next_ticket;
            inner.next_ticket += 1;

            let entry = CacheEntry {
                key: key.clone(),
                value,
                created_at: now,
                last_usage: now,
                ticket,
            };
            inner.map.insert(key.clone(), entry.clone());
            notices.push(Notice::Insert(key.clone()));
            inner.evict_excess(&mut notices);

            let settle = match (&entry.value, inner.options.keep_promises) {
                (CacheValue::Pending(shared), false) => Some((shared.clone(), ticket)),
                _ => None,
            };
            (entry, settle)
        };
        self.emit(notices);
        debug!("✓ Cache SET {:?}", key);

        if let Some((shared, ticket)) = settle {
            self.spawn_settle(key, shared, ticket);
        }
        entry
    }

    /// Spawn the settlement continuation for a pending write.
    ///
    /// Requires an ambient tokio runtime; without one the value simply
    /// stays pending.
    fn spawn_settle(&self, key: K, shared: SharedFuture<V>, ticket: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "⚠ No tokio runtime; pending value for {:?} will not auto-settle",
                key
            );
            return;
        };

        let cache = self.clone();
        handle.spawn(async move {
            let value = shared.await;
            cache.settle(&key, ticket, value);
        });
    }

    /// Overwrite a pending entry in place with its settled value.
    ///
    /// No-op unless `key` still maps to the exact write that produced the
    /// pending placeholder: a settlement must never resurrect an evicted key
    /// or clobber a newer entry that reused it. Timestamps and recency are
    /// left untouched.
    fn settle(&self, key: &K, ticket: u64, value: V) {
        let mut inner = self.lock_inner();
        match inner.map.get_mut(key) {
            Some(entry) if entry.ticket == ticket && entry.value.is_pending() => {
                entry.value = CacheValue::Ready(value);
                debug!("✓ Cache SETTLE {:?}", key);
            }
            _ => debug!("✗ Cache SETTLE {:?} -> stale write, dropped", key),
        }
    }

    /// Remove the entry for `key`. Returns whether anything was removed.
    pub fn delete(&self, key: &K) -> bool {
        let mut notices = Vec::new();
        let removed = {
            let mut inner = self.lock_inner();
            let removed = inner.map.remove(key).is_some();
            if removed {
                inner.forget(key);
                notices.push(Notice::Remove(key.clone()));
            }
            removed
        };
        self.emit(notices);

        if removed {
            debug!("✓ Cache DELETE {:?}", key);
        }
        removed
    }

    /// Optionally update the capacity, then evict least-recently-touched
    /// entries until the store fits.
    pub fn resize(&self, slots: Option<usize>) {
        let mut notices = Vec::new();
        {
            let mut inner = self.lock_inner();
            if let Some(slots) = slots {
                inner.options.slots = slots;
            }
            inner.evict_excess(&mut notices);
        }
        self.emit(notices);
    }

    /// Remove all entries and reset both store clocks.
    pub fn clear(&self) {
        {
            let mut inner = self.lock_inner();
            inner.map.clear();
            inner.usages.clear();
            inner.last_usage = None;
            inner.last_write = None;
        }
        self.emit(vec![Notice::Clear]);
        warn!("⚠ Cache CLEAR executed - all entries removed");
    }

    /// Current number of entries (including not-yet-reconciled expired
    /// ones).
    pub fn len(&self) -> usize {
        self.lock_inner().map.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock_inner().map.is_empty()
    }

    /// The keys in recency order, least-recently-touched first.
    pub fn usages(&self) -> Vec<K> {
        self.lock_inner().usages.clone()
    }

    /// Snapshot of all entries, in recency order.
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        let inner = self.lock_inner();
        inner
            .usages
            .iter()
            .filter_map(|key| inner.map.get(key).cloned())
            .collect()
    }

    /// Current capacity.
    pub fn slots(&self) -> usize {
        self.lock_inner().options.slots
    }

    /// Configured idle timeout.
    pub fn ttl(&self) -> Option<Duration> {
        self.lock_inner().options.ttl
    }

    /// Configured age timeout.
    pub fn max_age(&self) -> Option<Duration> {
        self.lock_inner().options.max_age
    }

    /// Whether pending values stay pending after settlement.
    pub fn keep_promises(&self) -> bool {
        self.lock_inner().options.keep_promises
    }

    /// Whether two handles share one underlying store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K: Debug, V> fmt::Debug for CacheSet<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CacheSet")
            .field("len", &inner.map.len())
            .field("slots", &inner.options.slots)
            .field("usages", &inner.usages)
            .finish()
    }
}
