//! # memo-kit
//!
//! A memoization framework backed by a bounded, recency-ordered cache.
//!
//! ## Features
//!
//! - **Three strategies:** full keyed cache, single remembered key, single
//!   remembered argument list — mutually exclusive per function
//! - **Bounded storage:** least-recently-touched eviction with a configurable
//!   slot count
//! - **Dual expiration clocks:** idle timeout (`ttl`) and absolute age
//!   (`max_age`), per entry and for the store as a whole, reconciled lazily
//! - **Async aware:** pending results are shared futures; optional in-place
//!   settlement once they resolve
//! - **Pluggable key resolvers:** structural JSON (with `NaN`/`Infinity`
//!   round-tripping), join, primitive-summary, or custom closures
//! - **Observable:** subscribe to inserts, evictions, expirations and clears
//!
//! ## Quick Start
//!
//! ```rust
//! use memo_kit::{memo_cache, CacheMemoOptions, CacheOptions, MemoTarget};
//! use std::time::Duration;
//!
//! # fn main() -> memo_kit::Result<()> {
//! let lookup = memo_cache(
//!     MemoTarget::of(|args: &(String, u32)| format!("{}#{}", args.0, args.1)),
//!     CacheMemoOptions::default()
//!         .with_cache(CacheOptions::default().with_slots(64).with_ttl(Duration::from_secs(300))),
//! )?;
//!
//! let v = lookup.call(&("alpha".to_string(), 1))?;
//! assert_eq!(v.ready(), Some("alpha#1".to_string()));
//!
//! // Same arguments, served from the cache.
//! lookup.call(&("alpha".to_string(), 1))?;
//! # Ok(())
//! # }
//! ```
//!
//! The cache engine is usable on its own as well; see [`CacheSet`].

#[macro_use]
extern crate log;

pub mod cache;
pub mod error;
pub mod key;
pub mod memo;
pub mod observer;
pub mod resolver;
pub mod serialization;

// Re-exports for convenience
pub use cache::{CacheEntry, CacheOptions, CacheSet, CacheValue, SharedFuture, DEFAULT_SLOTS};
pub use error::{Error, Result, STRATEGY_CONFLICT_MESSAGE};
pub use key::CacheKey;
pub use memo::{
    memo_cache, memo_cache_with, memo_last_key, memo_last_ref, ArgRef, CacheMemoOptions, Computed,
    MemoCache, MemoFn, MemoLastKey, MemoLastRef, MemoOptions, MemoTarget, Strategy,
};
pub use observer::CacheObserver;
pub use resolver::{
    ExtendedJsonResolver, FnResolver, JoinResolver, JsonResolver, KeyResolver, PrimitivesResolver,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
