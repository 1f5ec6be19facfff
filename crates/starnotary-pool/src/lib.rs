//! # Star Notary Validation Pool
//!
//! Proves that a client controls a wallet address before it may register a
//! star.
//!
//! ## Flow
//!
//! 1. [`ValidationPool::request_challenge`] opens a challenge: a message the
//!    client must sign within the validation window.
//! 2. [`ValidationPool::verify_signature`] checks the signed message. A match
//!    closes the challenge and records a one-shot authorization.
//! 3. The caller appends the star and calls
//!    [`ValidationPool::consume_authorization`].
//!
//! A challenge nobody answers is removed by a timer when its window runs
//! out, whether or not the address is ever seen again.
//!
//! ## Signatures
//!
//! The check sits behind the [`MessageVerifier`] trait. The default,
//! [`BitcoinVerifier`], accepts Bitcoin message signatures as produced by
//! client wallets. [`EthereumVerifier`] accepts Ethereum-style ones.

pub mod config;
pub mod error;
pub mod pool;
pub mod request;
pub mod verifier;

pub use config::{PoolConfig, DEFAULT_VALIDATION_WINDOW};
pub use error::{PoolError, Result};
pub use pool::ValidationPool;
pub use request::{
    challenge_message, ValidatedRequest, ValidationRequest, ValidationStatus, Verification,
};
pub use verifier::{BitcoinVerifier, EthereumVerifier, MessageVerifier};
