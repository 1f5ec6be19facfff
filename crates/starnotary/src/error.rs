//! Error types for the Notary.

use starnotary_core::WalletAddress;
use starnotary_ledger::LedgerError;
use starnotary_pool::PoolError;
use starnotary_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Notary operations.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Validation pool error.
    #[error("validation pool error: {0}")]
    Pool(#[from] PoolError),

    /// Storage error while opening a store.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// No open challenge: it expired or was never requested.
    #[error("validation window expired")]
    ValidationExpired,

    /// The signature does not match the open challenge.
    #[error("invalid signature")]
    InvalidSignature,

    /// The address holds no authorization to register a star.
    #[error("address {0} not authorized to post new star")]
    Unauthorized(WalletAddress),

    /// A star submission failed input validation.
    #[error("invalid star submission: {0}")]
    InvalidSubmission(String),
}

/// Result type for Notary operations.
pub type Result<T> = std::result::Result<T, NotaryError>;
