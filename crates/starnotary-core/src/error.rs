//! Error types for Star Notary Core.

use thiserror::Error;

/// Core errors that can occur while encoding blocks or parsing wallet data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed wallet address: {0}")]
    MalformedAddress(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("unsupported block version: {0}")]
    UnsupportedVersion(u64),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
