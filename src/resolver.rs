//! Key resolvers: pure functions from an argument list to a cache key.
//!
//! A resolver decides which calls count as "the same call". The built-in
//! resolvers cover the usual trade-offs:
//!
//! | Resolver | Key for `(2, "ab", vec![1, 2])` | Trade-off |
//! |----------|--------------------------------|-----------|
//! | [`JoinResolver`] | `[2,ab,[1,2]]` | cheapest, collision-prone |
//! | [`PrimitivesResolver`] | `[2,'ab',Array(2)]` | collections by size only |
//! | [`JsonResolver`] | `[2,"ab",[1,2]]` | structural, loses `NaN`/infinities |
//! | [`ExtendedJsonResolver`] | `[2,"ab",[1,2]]` | structural, keeps them (default) |
//!
//! Custom resolvers are wrapped in [`FnResolver`]; a failing resolver
//! propagates its error to the caller of the wrapped function and nothing is
//! cached.
//!
//! Resolvers must be pure: same arguments, same key, no side effects.

use crate::error::{Error, Result};
use crate::key::CacheKey;
use crate::serialization::to_extended_json;
use serde::Serialize;
use serde_json::Value;

/// Maps a call's arguments to a cache key.
///
/// `A` is the argument list type, usually a tuple.
pub trait KeyResolver<A>: Send + Sync {
    fn resolve(&self, args: &A) -> Result<CacheKey>;
}

/// View the serialized arguments as a list, wrapping a single non-tuple
/// argument into a one-element list.
fn argument_list<A: Serialize>(args: &A) -> Result<Vec<Value>> {
    match serde_json::to_value(args)? {
        Value::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

/// Concatenate-and-join resolver: `[a,b,c]`.
///
/// Strings are joined verbatim (unquoted), so `("a,b",)` and `("a", "b")`
/// collide. Use a structural resolver when that matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinResolver;

fn join_fragment(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        composite => composite.to_string(),
    }
}

impl<A: Serialize> KeyResolver<A> for JoinResolver {
    fn resolve(&self, args: &A) -> Result<CacheKey> {
        let items = argument_list(args)?;
        let joined: Vec<String> = items.iter().map(join_fragment).collect();
        Ok(CacheKey::Str(format!("[{}]", joined.join(","))))
    }
}

/// Primitive-summary resolver: primitives verbatim, collections by size.
///
/// `("a", vec![1, 2, 3])` resolves to `['a',Array(3)]`. Cheap for large
/// collection arguments, at the cost of treating same-sized collections as
/// equivalent.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitivesResolver;

fn primitive_fragment(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Array(items) => format!("Array({})", items.len()),
        Value::Object(fields) => format!("Object({})", fields.len()),
    }
}

impl<A: Serialize> KeyResolver<A> for PrimitivesResolver {
    fn resolve(&self, args: &A) -> Result<CacheKey> {
        let items = argument_list(args)?;
        let summarized: Vec<String> = items.iter().map(primitive_fragment).collect();
        Ok(CacheKey::Str(format!("[{}]", summarized.join(","))))
    }
}

/// Structural JSON resolver.
///
/// Non-finite floats collapse to `null` (JSON's native behavior); prefer
/// [`ExtendedJsonResolver`] when they must stay distinct.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonResolver;

impl<A: Serialize> KeyResolver<A> for JsonResolver {
    fn resolve(&self, args: &A) -> Result<CacheKey> {
        Ok(CacheKey::Str(serde_json::to_string(args)?))
    }
}

/// Structural JSON resolver with extended literal handling (the default).
///
/// Round-trips `NaN`, `Infinity` and `-Infinity` as quoted literals instead
/// of losing them to `null`. See [`crate::serialization`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedJsonResolver;

impl<A: Serialize> KeyResolver<A> for ExtendedJsonResolver {
    fn resolve(&self, args: &A) -> Result<CacheKey> {
        Ok(CacheKey::Str(to_extended_json(args)?))
    }
}

/// Adapter for user-supplied resolver closures.
///
/// # Example
///
/// ```rust
/// use memo_kit::resolver::{FnResolver, KeyResolver};
/// use memo_kit::CacheKey;
///
/// let resolver = FnResolver(|args: &(u32, u32)| Ok(CacheKey::Num(args.0 as i64)));
/// assert_eq!(resolver.resolve(&(7, 99)).unwrap(), CacheKey::Num(7));
/// ```
pub struct FnResolver<F>(pub F);

impl<A, F> KeyResolver<A> for FnResolver<F>
where
    F: Fn(&A) -> Result<CacheKey> + Send + Sync,
{
    fn resolve(&self, args: &A) -> Result<CacheKey> {
        (self.0)(args).map_err(|e| match e {
            Error::ResolverError(_) => e,
            other => Error::ResolverError(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_resolver() {
        let key = JoinResolver.resolve(&(1, "a", true)).unwrap();
        assert_eq!(key, CacheKey::from("[1,a,true]"));
    }

    #[test]
    fn test_join_resolver_single_argument() {
        let key = JoinResolver.resolve(&42).unwrap();
        assert_eq!(key, CacheKey::from("[42]"));
    }

    #[test]
    fn test_primitives_resolver() {
        let key = PrimitivesResolver
            .resolve(&(2, "ab", vec![1, 2, 3]))
            .unwrap();
        assert_eq!(key, CacheKey::from("[2,'ab',Array(3)]"));
    }

    #[test]
    fn test_primitives_resolver_object_summary() {
        #[derive(serde::Serialize)]
        struct Opts {
            a: u8,
            b: u8,
        }
        let key = PrimitivesResolver
            .resolve(&(Opts { a: 1, b: 2 },))
            .unwrap();
        assert_eq!(key, CacheKey::from("[Object(2)]"));
    }

    #[test]
    fn test_json_resolver_loses_nan() {
        let key = JsonResolver.resolve(&(f64::NAN,)).unwrap();
        assert_eq!(key, CacheKey::from("[null]"));
    }

    #[test]
    fn test_extended_resolver_keeps_nan_and_infinities() {
        let resolver = ExtendedJsonResolver;
        assert_eq!(
            resolver.resolve(&(f64::NAN,)).unwrap(),
            CacheKey::from("[\"NaN\"]")
        );
        assert_eq!(
            resolver.resolve(&(f64::INFINITY, f64::NEG_INFINITY)).unwrap(),
            CacheKey::from("[\"Infinity\",\"-Infinity\"]")
        );
    }

    #[test]
    fn test_fn_resolver_error_is_tagged() {
        let resolver = FnResolver(|_args: &u32| Err(Error::Other("boom".to_string())));
        let err = resolver.resolve(&1).unwrap_err();
        assert!(matches!(err, Error::ResolverError(_)));
    }
}
