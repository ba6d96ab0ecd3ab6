//! Error types for the memoization framework.

use std::fmt;

/// Result type for memoization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memoization framework.
///
/// All fallible operations return `Result<T>` where `Result` is defined as
/// `std::result::Result<T, Error>`. Different variants represent different
/// failure modes:
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A second, different memoization strategy was attached to a function
    /// that is already wrapped.
    ///
    /// Exactly one strategy may be attached to a function for its lifetime.
    /// Re-wrapping with the *same* strategy is a no-op; wrapping with a
    /// different one raises this error and leaves the attached strategy
    /// unchanged.
    ///
    /// The message is fixed and stable so callers may match on it.
    StrategyConflict,

    /// A user-supplied key resolver failed.
    ///
    /// The failure is propagated synchronously to the caller of the wrapped
    /// function and no cache entry is written.
    ResolverError(String),

    /// Key serialization failed when converting an argument list to key text.
    ///
    /// This occurs when the arguments' `Serialize` implementation fails.
    /// Common causes:
    /// - Arguments contain non-serializable types
    /// - A `Serialize` implementation raises a custom error
    SerializationError(String),

    /// Generic error with custom message.
    ///
    /// Used for errors that don't fit into other variants, including errors
    /// surfaced by fallible wrapped computations.
    Other(String),
}

/// Fixed message for [`Error::StrategyConflict`].
pub const STRATEGY_CONFLICT_MESSAGE: &str =
    "Function was already memoized with a different memoization function";

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StrategyConflict => write!(f, "{}", STRATEGY_CONFLICT_MESSAGE),
            Error::ResolverError(msg) => write!(f, "Resolver error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerializationError(msg.to_string())
    }
}
