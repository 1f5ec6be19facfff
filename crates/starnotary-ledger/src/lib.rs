//! # Star Notary Ledger
//!
//! The append-only, hash-linked chain of star claims.
//!
//! ## Overview
//!
//! [`Chain`] owns block construction and persistence. It assigns each block
//! its height, time, link to the previous block and content hash, and writes
//! it to a [`Store`](starnotary_store::Store) keyed by height. Integrity can
//! be re-verified at any time with [`Chain::validate_chain`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use starnotary_core::{BlockBody, Star, SystemClock, WalletAddress};
//! use starnotary_ledger::Chain;
//! use starnotary_store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("notary.db").unwrap();
//!     let chain = Chain::open(store, Arc::new(SystemClock)).await.unwrap();
//!
//!     let address = WalletAddress::new("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
//!     let star = Star::new("16h 29m 1.0s", "-26° 29' 24.9", "First star");
//!     let block = chain.append(BlockBody::star(address, star)).await.unwrap();
//!
//!     assert!(chain.validate_block(block.height).await.unwrap());
//! }
//! ```

pub mod chain;
pub mod error;

pub use chain::{Chain, ChainFault};
pub use error::{LedgerError, Result};
