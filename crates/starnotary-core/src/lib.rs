//! # Star Notary Core
//!
//! Pure primitives for Star Notary: blocks, canonical encoding, and wallet
//! message signatures (Bitcoin and Ethereum style).
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the block and signature data structures.
//!
//! ## Key Types
//!
//! - [`Block`] - One entry of the append-only chain
//! - [`BlockHash`] - Content hash of a block (Blake3)
//! - [`BlockBody`] - Genesis sentinel or a [`StarClaim`]
//! - [`WalletAddress`] - The address a star claim is bound to
//! - [`BitcoinSignature`] - A compact recoverable signature over a challenge message
//! - [`EthereumSignature`] - The Ethereum-style alternative
//!
//! ## Canonicalization
//!
//! Blocks are encoded using deterministic CBOR. See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod types;

pub use block::{Block, BlockBody, Star, StarClaim, GENESIS_BODY};
pub use canonical::{canonical_block_bytes, decode_block, hashing_bytes};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{
    bitcoin_message_hash, personal_message_hash, AddressKind, BitcoinSignature,
    EthereumSignature, WalletAddress,
};
pub use error::CoreError;
pub use types::BlockHash;
