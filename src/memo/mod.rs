//! Memoization strategies and the wrapping contract.
//!
//! Three mutually exclusive strategies wrap a computation:
//!
//! ```text
//! Which calls should share a result?
//!     ├─ Arbitrary argument combinations, bounded memory
//!     │  └─ Use: memo_cache (full keyed cache)
//!     │
//!     ├─ Usually the same arguments as last time, resolver available
//!     │  └─ Use: memo_last_key (one remembered key)
//!     │
//!     └─ Usually the same argument values as last time, no resolver
//!        └─ Use: memo_last_ref (one remembered argument list)
//! ```
//!
//! # The wrapping contract
//!
//! A wrap operation takes a [`MemoTarget`]: either a bare computation or an
//! already-wrapped [`MemoFn`]. Wrapping is idempotent per strategy and
//! exclusive across strategies:
//!
//! - Re-wrapping with the **same** strategy returns the wrapped function
//!   unchanged (no double-wrapping, no state reset).
//! - Wrapping with a **different** strategy fails with
//!   [`Error::StrategyConflict`] and leaves the attached strategy untouched.
//!
//! `MemoFn` values are cheap to clone and clones share state, so callers
//! keep a usable handle even when a wrap attempt fails.
//!
//! # Example
//!
//! ```rust
//! use memo_kit::{memo_cache, CacheMemoOptions, MemoTarget};
//!
//! # fn main() -> memo_kit::Result<()> {
//! let double = memo_cache(
//!     MemoTarget::of(|args: &(i64,)| args.0 * 2),
//!     CacheMemoOptions::default(),
//! )?;
//!
//! assert_eq!(double.call(&(21,))?.ready(), Some(42));
//! // Second call with the same arguments is served from the cache.
//! assert_eq!(double.call(&(21,))?.ready(), Some(42));
//! # Ok(())
//! # }
//! ```

mod keyed;
mod last_key;
mod last_ref;

pub use keyed::MemoCache;
pub use last_key::MemoLastKey;
pub use last_ref::{ArgRef, MemoLastRef};

use crate::cache::{CacheOptions, CacheSet, CacheValue};
use crate::error::{Error, Result};
use crate::key::CacheKey;
use crate::resolver::{ExtendedJsonResolver, KeyResolver};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The stored computation: arguments in, settled-or-pending result out.
pub type ComputeFn<A, V> = dyn Fn(&A) -> Result<Computed<V>> + Send + Sync;

/// One computation outcome, before it is stored.
pub enum Computed<V> {
    /// A settled value.
    Ready(V),
    /// An asynchronous result that settles later.
    Pending(BoxFuture<'static, V>),
}

pub(crate) fn into_cache_value<V: Clone>(computed: Computed<V>) -> CacheValue<V> {
    match computed {
        Computed::Ready(v) => CacheValue::Ready(v),
        Computed::Pending(future) => CacheValue::Pending(future.shared()),
    }
}

/// Discriminant naming the strategy attached to a wrapped function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Full keyed cache (see [`MemoCache`]).
    Keyed,
    /// Single remembered key (see [`MemoLastKey`]).
    LastKey,
    /// Single remembered argument list (see [`MemoLastRef`]).
    LastRef,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Keyed => write!(f, "Keyed"),
            Strategy::LastKey => write!(f, "LastKey"),
            Strategy::LastRef => write!(f, "LastRef"),
        }
    }
}

/// What a wrap operation receives: a bare computation or a function that is
/// already wrapped.
pub enum MemoTarget<A, V> {
    /// An unwrapped computation.
    Bare(Arc<ComputeFn<A, V>>),
    /// An already-wrapped function, subject to the idempotency and
    /// exclusivity rules.
    Wrapped(MemoFn<A, V>),
}

impl<A, V> MemoTarget<A, V> {
    /// Target a plain synchronous computation.
    pub fn of<F>(f: F) -> Self
    where
        F: Fn(&A) -> V + Send + Sync + 'static,
    {
        MemoTarget::Bare(Arc::new(move |args: &A| Ok(Computed::Ready(f(args)))))
    }

    /// Target a fallible synchronous computation. A returned error
    /// propagates to the caller and nothing is cached.
    pub fn of_fallible<F>(f: F) -> Self
    where
        F: Fn(&A) -> Result<V> + Send + Sync + 'static,
    {
        MemoTarget::Bare(Arc::new(move |args: &A| f(args).map(Computed::Ready)))
    }

    /// Target an asynchronous computation. The produced future is stored as
    /// a pending value and shared between callers until it settles.
    pub fn of_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        MemoTarget::Bare(Arc::new(move |args: &A| {
            Ok(Computed::Pending(f(args).boxed()))
        }))
    }

    /// Target an already-wrapped function.
    pub fn wrapped(f: MemoFn<A, V>) -> Self {
        MemoTarget::Wrapped(f)
    }
}

impl<A, V> From<MemoFn<A, V>> for MemoTarget<A, V> {
    fn from(f: MemoFn<A, V>) -> Self {
        MemoTarget::Wrapped(f)
    }
}

/// Options for the resolver-based strategies.
pub struct MemoOptions<A> {
    /// Key resolver; defaults to [`ExtendedJsonResolver`].
    pub resolver: Option<Arc<dyn KeyResolver<A>>>,
}

impl<A> Default for MemoOptions<A> {
    fn default() -> Self {
        MemoOptions { resolver: None }
    }
}

impl<A> MemoOptions<A> {
    /// Use a custom key resolver.
    pub fn with_resolver(mut self, resolver: impl KeyResolver<A> + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }
}

/// Options for the keyed strategy: resolver plus cache configuration.
pub struct CacheMemoOptions<A> {
    /// Key resolver; defaults to [`ExtendedJsonResolver`].
    pub resolver: Option<Arc<dyn KeyResolver<A>>>,
    /// Configuration for the backing [`CacheSet`].
    pub cache: CacheOptions,
}

impl<A> Default for CacheMemoOptions<A> {
    fn default() -> Self {
        CacheMemoOptions {
            resolver: None,
            cache: CacheOptions::default(),
        }
    }
}

impl<A> CacheMemoOptions<A> {
    /// Use a custom key resolver.
    pub fn with_resolver(mut self, resolver: impl KeyResolver<A> + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Configure the backing cache.
    pub fn with_cache(mut self, options: CacheOptions) -> Self {
        self.cache = options;
        self
    }
}

fn resolver_or_default<A: Serialize + 'static>(
    resolver: Option<Arc<dyn KeyResolver<A>>>,
) -> Arc<dyn KeyResolver<A>> {
    resolver.unwrap_or_else(|| Arc::new(ExtendedJsonResolver))
}

/// A function wrapped by exactly one memoization strategy.
///
/// The variant is the strategy discriminant; the identity utilities
/// ([`strategy`](MemoFn::strategy), [`is_keyed`](MemoFn::is_keyed), ...)
/// pattern-match on it rather than probing structure.
pub enum MemoFn<A, V> {
    Keyed(MemoCache<A, V>),
    LastKey(MemoLastKey<A, V>),
    LastRef(MemoLastRef<A, V>),
}

impl<A, V> Clone for MemoFn<A, V> {
    fn clone(&self) -> Self {
        match self {
            MemoFn::Keyed(m) => MemoFn::Keyed(m.clone()),
            MemoFn::LastKey(m) => MemoFn::LastKey(m.clone()),
            MemoFn::LastRef(m) => MemoFn::LastRef(m.clone()),
        }
    }
}

impl<A, V> MemoFn<A, V> {
    /// The strategy attached to this function.
    pub fn strategy(&self) -> Strategy {
        match self {
            MemoFn::Keyed(_) => Strategy::Keyed,
            MemoFn::LastKey(_) => Strategy::LastKey,
            MemoFn::LastRef(_) => Strategy::LastRef,
        }
    }

    /// Whether the keyed strategy is attached.
    pub fn is_keyed(&self) -> bool {
        matches!(self, MemoFn::Keyed(_))
    }

    /// Whether the last-key strategy is attached.
    pub fn is_last_key(&self) -> bool {
        matches!(self, MemoFn::LastKey(_))
    }

    /// Whether the last-reference strategy is attached.
    pub fn is_last_ref(&self) -> bool {
        matches!(self, MemoFn::LastRef(_))
    }

    /// The keyed strategy, if attached.
    pub fn as_keyed(&self) -> Option<&MemoCache<A, V>> {
        match self {
            MemoFn::Keyed(m) => Some(m),
            _ => None,
        }
    }

    /// The last-key strategy, if attached.
    pub fn as_last_key(&self) -> Option<&MemoLastKey<A, V>> {
        match self {
            MemoFn::LastKey(m) => Some(m),
            _ => None,
        }
    }

    /// The last-reference strategy, if attached.
    pub fn as_last_ref(&self) -> Option<&MemoLastRef<A, V>> {
        match self {
            MemoFn::LastRef(m) => Some(m),
            _ => None,
        }
    }

    /// Whether two handles are the same wrapped function (clones sharing
    /// state), as opposed to two independent wraps of the same computation.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (MemoFn::Keyed(a), MemoFn::Keyed(b)) => a.shares_state_with(b),
            (MemoFn::LastKey(a), MemoFn::LastKey(b)) => a.shares_state_with(b),
            (MemoFn::LastRef(a), MemoFn::LastRef(b)) => a.shares_state_with(b),
            _ => false,
        }
    }
}

impl<A, V> MemoFn<A, V>
where
    A: Clone + PartialEq,
    V: Clone + Send + Sync + 'static,
{
    /// Invoke the wrapped function through its strategy.
    pub fn call(&self, args: &A) -> Result<CacheValue<V>> {
        match self {
            MemoFn::Keyed(m) => m.call(args),
            MemoFn::LastKey(m) => m.call(args),
            MemoFn::LastRef(m) => m.call(args),
        }
    }
}

impl<A, V> MemoFn<A, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// The backing cache handle, when the keyed strategy is attached.
    pub fn cache(&self) -> Option<&CacheSet<CacheKey, V>> {
        self.as_keyed().map(|m| m.cache())
    }
}

impl<A, V> fmt::Debug for MemoFn<A, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemoFn").field(&self.strategy()).finish()
    }
}

/// Wrap a computation with the full keyed-cache strategy.
///
/// Idempotent for already-keyed targets; fails with
/// [`Error::StrategyConflict`] for targets wrapped by another strategy.
pub fn memo_cache<A, V>(
    target: MemoTarget<A, V>,
    options: CacheMemoOptions<A>,
) -> Result<MemoFn<A, V>>
where
    A: Serialize + 'static,
    V: Clone + Send + Sync + 'static,
{
    match target {
        MemoTarget::Wrapped(f @ MemoFn::Keyed(_)) => Ok(f),
        MemoTarget::Wrapped(_) => Err(Error::StrategyConflict),
        MemoTarget::Bare(compute) => {
            let resolver = resolver_or_default(options.resolver);
            let cache = CacheSet::new(options.cache);
            Ok(MemoFn::Keyed(MemoCache::from_parts(
                compute, resolver, cache,
            )))
        }
    }
}

/// Wrap a computation with the keyed-cache strategy over an explicitly
/// shared cache.
///
/// Every function wrapped over the same `cache` handle reads and writes the
/// same store; keeping resolved keys from colliding across functions is the
/// caller's responsibility. For an already-keyed target the existing wrap
/// (and its existing cache) is returned unchanged.
pub fn memo_cache_with<A, V>(
    target: MemoTarget<A, V>,
    options: MemoOptions<A>,
    cache: CacheSet<CacheKey, V>,
) -> Result<MemoFn<A, V>>
where
    A: Serialize + 'static,
    V: Clone + Send + Sync + 'static,
{
    match target {
        MemoTarget::Wrapped(f @ MemoFn::Keyed(_)) => Ok(f),
        MemoTarget::Wrapped(_) => Err(Error::StrategyConflict),
        MemoTarget::Bare(compute) => {
            let resolver = resolver_or_default(options.resolver);
            Ok(MemoFn::Keyed(MemoCache::from_parts(
                compute, resolver, cache,
            )))
        }
    }
}

/// Wrap a computation with the last-key strategy.
///
/// Remembers exactly one resolved key and its value; every miss replaces
/// the pair. Same idempotency and exclusivity rules as [`memo_cache`].
pub fn memo_last_key<A, V>(target: MemoTarget<A, V>, options: MemoOptions<A>) -> Result<MemoFn<A, V>>
where
    A: Serialize + 'static,
    V: Clone + Send + Sync + 'static,
{
    match target {
        MemoTarget::Wrapped(f @ MemoFn::LastKey(_)) => Ok(f),
        MemoTarget::Wrapped(_) => Err(Error::StrategyConflict),
        MemoTarget::Bare(compute) => {
            let resolver = resolver_or_default(options.resolver);
            Ok(MemoFn::LastKey(MemoLastKey::from_parts(compute, resolver)))
        }
    }
}

/// Wrap a computation with the last-reference strategy.
///
/// No resolver: the previous call's argument list is remembered and
/// compared positionally. Same idempotency and exclusivity rules as
/// [`memo_cache`].
pub fn memo_last_ref<A, V>(target: MemoTarget<A, V>) -> Result<MemoFn<A, V>> {
    match target {
        MemoTarget::Wrapped(f @ MemoFn::LastRef(_)) => Ok(f),
        MemoTarget::Wrapped(_) => Err(Error::StrategyConflict),
        MemoTarget::Bare(compute) => Ok(MemoFn::LastRef(MemoLastRef::from_parts(compute))),
    }
}
