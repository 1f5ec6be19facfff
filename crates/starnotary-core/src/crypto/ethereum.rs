//! Ethereum-style wallet signatures.
//!
//! The address is the last 20 bytes of keccak256 over the uncompressed
//! public key, and messages are hashed as EIP-191 personal messages.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use std::fmt;

use super::WalletAddress;
use crate::error::CoreError;

/// Prefix of an EIP-191 personal message.
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

impl WalletAddress {
    /// Derive the Ethereum address of a public key (lowercase hex, `0x` prefixed).
    pub fn ethereum(key: &VerifyingKey) -> Self {
        Self::new(format!("0x{}", hex::encode(address_bytes(key))))
    }

    /// Parse the 20 bytes of an Ethereum address. Case-insensitive, `0x`
    /// prefix optional.
    pub fn ethereum_bytes(&self) -> Result<[u8; 20], CoreError> {
        let digits = strip_hex_prefix(self.as_str());
        let bytes = hex::decode(digits)
            .map_err(|e| CoreError::MalformedAddress(format!("{}: {}", self, e)))?;
        bytes
            .try_into()
            .map_err(|_| CoreError::MalformedAddress(format!("{}: expected 20 bytes", self)))
    }
}

/// A 65-byte recoverable signature: `r || s || v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EthereumSignature {
    signature: Signature,
    recovery_id: RecoveryId,
}

impl EthereumSignature {
    /// Create from a k256 signature and its recovery id.
    pub fn from_parts(signature: Signature, recovery_id: RecoveryId) -> Self {
        Self {
            signature,
            recovery_id,
        }
    }

    /// Parse from hex. `v` may be 0/1 or 27/28.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(strip_hex_prefix(s))
            .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;
        if bytes.len() != 65 {
            return Err(CoreError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let signature = Signature::from_slice(&bytes[..64])
            .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;

        let v = match bytes[64] {
            0 | 27 => 0,
            1 | 28 => 1,
            other => {
                return Err(CoreError::MalformedSignature(format!(
                    "invalid recovery id {}",
                    other
                )))
            }
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| CoreError::MalformedSignature(format!("invalid recovery id {}", v)))?;

        Ok(Self {
            signature,
            recovery_id,
        })
    }

    /// Convert to hex (`v` rendered as 27/28).
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&self.signature.to_bytes());
        bytes.push(self.recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    /// Recover the address that produced this signature over `message`.
    ///
    /// Returns `None` when no public key can be recovered.
    pub fn recover(&self, message: &str) -> Option<WalletAddress> {
        let prehash = personal_message_hash(message);
        VerifyingKey::recover_from_prehash(&prehash, &self.signature, self.recovery_id)
            .ok()
            .map(|key| WalletAddress::ethereum(&key))
    }

    /// Check that `address` signed `message`.
    ///
    /// Fails only if the address itself cannot be parsed; a signature from
    /// another key is `Ok(false)`.
    pub fn verify(&self, address: &WalletAddress, message: &str) -> Result<bool, CoreError> {
        let expected = address.ethereum_bytes()?;
        let Some(recovered) = self.recover(message) else {
            return Ok(false);
        };
        Ok(recovered.ethereum_bytes()? == expected)
    }
}

impl fmt::Debug for EthereumSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthereumSignature({}...)", &self.to_hex()[..18])
    }
}

/// Keccak256 of an EIP-191 personal message.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the 20 address bytes of a public key.
fn address_bytes(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix of the uncompressed point.
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
