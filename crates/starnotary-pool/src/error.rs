//! Error types for the validation pool.

use starnotary_core::CoreError;
use thiserror::Error;

/// Errors that can occur during pool operations.
///
/// A signature that parses but does not match is not an error; it is
/// reported as [`Verification::Invalid`](crate::Verification::Invalid).
#[derive(Debug, Error)]
pub enum PoolError {
    /// The signature or address could not be parsed.
    #[error("malformed signature request: {0}")]
    Malformed(#[from] CoreError),

    /// The pool state lock was poisoned by a panicking holder.
    #[error("pool lock poisoned")]
    LockPoisoned,
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
