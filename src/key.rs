//! Cache key type and helpers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OPAQUE: AtomicU64 = AtomicU64::new(1);

/// A cache key: text, an integer, or an opaque token.
///
/// Resolvers derive a `CacheKey` from a call's arguments to identify
/// equivalent calls. Opaque tokens are process-unique keys with no meaning
/// beyond identity, for callers that manage keys by hand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Textual key (what the built-in resolvers produce).
    Str(String),
    /// Integer key.
    Num(i64),
    /// Opaque process-unique token.
    Opaque(u64),
}

impl CacheKey {
    /// Allocate a fresh opaque key, distinct from every other key created
    /// through this constructor in the current process.
    pub fn opaque() -> Self {
        CacheKey::Opaque(NEXT_OPAQUE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Str(s) => write!(f, "{}", s),
            CacheKey::Num(n) => write!(f, "{}", n),
            CacheKey::Opaque(id) => write!(f, "#{}", id),
        }
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::Str(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::Str(s.to_string())
    }
}

impl From<i64> for CacheKey {
    fn from(n: i64) -> Self {
        CacheKey::Num(n)
    }
}

impl From<i32> for CacheKey {
    fn from(n: i32) -> Self {
        CacheKey::Num(n as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality() {
        assert_eq!(CacheKey::from("a"), CacheKey::Str("a".to_string()));
        assert_eq!(CacheKey::from(7), CacheKey::Num(7));
        assert_ne!(CacheKey::from("7"), CacheKey::from(7));
    }

    #[test]
    fn test_opaque_keys_are_unique() {
        let a = CacheKey::opaque();
        let b = CacheKey::opaque();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::from("user:1").to_string(), "user:1");
        assert_eq!(CacheKey::from(42).to_string(), "42");
    }
}
