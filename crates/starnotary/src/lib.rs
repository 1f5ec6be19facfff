//! # Star Notary
//!
//! Register stars on a hash-linked, append-only ledger after proving
//! control of a wallet address.
//!
//! ## Overview
//!
//! This crate provides a unified API over the Star Notary components:
//!
//! - **Core** ([`starnotary_core`]): Blocks, canonical encoding, wallet signatures
//! - **Store** ([`starnotary_store`]): SQLite and in-memory block storage
//! - **Ledger** ([`starnotary_ledger`]): The chain and its integrity checks
//! - **Pool** ([`starnotary_pool`]): Ownership challenges and authorizations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use starnotary::{Notary, NotaryConfig, StarSubmission};
//!
//! async fn example(address: &str, signature: &str) {
//!     let notary = Notary::open_path("notary.db", NotaryConfig::default())
//!         .await
//!         .unwrap();
//!
//!     // The client signs `request.message` with its wallet.
//!     let request = notary.request_validation(address).unwrap();
//!     notary.validate_signature(address, signature).unwrap();
//!
//!     let star = StarSubmission::new("16h 29m 1.0s", "-26° 29' 24", "My star");
//!     let block = notary.submit_star(address, star).await.unwrap();
//!     assert_eq!(block.story_decoded().as_deref(), Some("My star"));
//! }
//! ```
//!
//! ## Integrity
//!
//! Each block's hash covers its canonical encoding, and each block points
//! at the hash of the one before it. [`Notary::validate_chain`] re-verifies
//! both for the whole chain.

pub mod config;
pub mod error;
pub mod notary;
pub mod star;

pub use config::NotaryConfig;
pub use error::{NotaryError, Result};
pub use notary::Notary;
pub use star::{StarBlock, StarSubmission, MAX_COORDINATE_LEN, MAX_STORY_LEN};

// Re-export component crates
pub use starnotary_core as core;
pub use starnotary_ledger as ledger;
pub use starnotary_pool as pool;
pub use starnotary_store as store;

// Re-export commonly used types
pub use starnotary_core::{Block, BlockBody, BlockHash, Star, WalletAddress};
pub use starnotary_ledger::{Chain, ChainFault};
pub use starnotary_pool::{
    BitcoinVerifier, EthereumVerifier, MessageVerifier, PoolConfig, ValidationRequest,
    ValidationStatus, Verification,
};
pub use starnotary_store::{MemoryStore, SqliteStore, Store};
