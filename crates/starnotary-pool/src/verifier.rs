//! The signature check behind [`ValidationPool`](crate::ValidationPool).

use starnotary_core::{BitcoinSignature, CoreError, EthereumSignature, WalletAddress};

/// Checks that a signature over a message was made by an address.
///
/// Returns `Ok(false)` for a well-formed signature by someone else, and an
/// error when the address or signature cannot be parsed at all.
pub trait MessageVerifier: Send + Sync + 'static {
    fn verify(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<bool, CoreError>;
}

/// Bitcoin message signatures: a base64 compact signature over a "Bitcoin
/// Signed Message", checked against a base58check address.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcoinVerifier;

impl MessageVerifier for BitcoinVerifier {
    fn verify(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<bool, CoreError> {
        BitcoinSignature::from_base64(signature)?.verify(address, message)
    }
}

/// Ethereum-style wallet signatures: the signer's address is recovered from
/// a 65-byte hex signature over an EIP-191 personal message.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumVerifier;

impl MessageVerifier for EthereumVerifier {
    fn verify(
        &self,
        address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<bool, CoreError> {
        EthereumSignature::from_hex(signature)?.verify(address, message)
    }
}
