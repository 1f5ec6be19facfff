//! Wallet addresses and message signatures.
//!
//! Both supported wallet families sign with secp256k1 and produce
//! recoverable signatures, so verification is address-derived: the signer's
//! public key is recovered from the signature, its address is derived, and
//! that is compared with the claimed address.
//!
//! - [`bitcoin`]: base58check addresses and base64 compact signatures over a
//!   "Bitcoin Signed Message". This is what client wallets produce by default.
//! - [`ethereum`]: `0x` hex addresses and `r || s || v` hex signatures over
//!   an EIP-191 personal message.

pub mod bitcoin;
pub mod ethereum;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use bitcoin::{bitcoin_message_hash, AddressKind, BitcoinSignature};
pub use ethereum::{personal_message_hash, EthereumSignature};

/// A wallet address as submitted by a client.
///
/// Kept verbatim: it keys the validation pool and is compared byte for byte
/// when looking up blocks. Each wallet family parses it only when checking a
/// signature.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
