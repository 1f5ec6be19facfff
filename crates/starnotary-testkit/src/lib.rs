//! # Star Notary Testkit
//!
//! Testing utilities for Star Notary.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Wallets**: secp256k1 keys that sign challenge messages the way a
//!   client wallet would
//! - **Fixtures**: a store that fails on demand, for error-path tests
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Signing a Challenge
//!
//! ```rust
//! use starnotary_testkit::TestWallet;
//!
//! let wallet = TestWallet::from_seed(7);
//! let message = format!("{}:1541605128:starRegistry", wallet.address());
//! let signature = wallet.sign(&message);
//! assert_eq!(signature.len(), 88);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use starnotary_testkit::generators::star;
//!
//! proptest! {
//!     #[test]
//!     fn story_survives_hex(star in star()) {
//!         let _ = star.story_decoded();
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod wallet;

pub use fixtures::FailingStore;
pub use wallet::TestWallet;
