//! Error types for the ledger.

use starnotary_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// Lookup misses are `None` or empty results, never errors. Integrity
/// failures are reported by the validation methods, not raised.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage error, passed through untouched.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A persisted value could not be decoded as a block.
    #[error("corrupt block at height {height}: {reason}")]
    CorruptBlock { height: u64, reason: String },

    /// A validation targeted a height with no block.
    #[error("no block at height {0}")]
    BlockNotFound(u64),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
