//! Bitcoin message signatures.
//!
//! The format produced by `signmessage` in Bitcoin Core and by most client
//! wallets. The message is prefixed with the "Bitcoin Signed Message" magic,
//! hashed with double SHA-256, and signed into a 65-byte compact signature.
//! The first byte of that signature carries the recovery id and the address
//! kind, and the whole thing travels base64 encoded.

use base64::Engine as _;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;

use super::WalletAddress;
use crate::error::CoreError;

/// Magic prefix of a signed message, length byte included.
const MESSAGE_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";

/// Version byte of a mainnet pay-to-pubkey-hash address.
pub const P2PKH_VERSION: u8 = 0x00;

/// Version byte of a mainnet pay-to-script-hash address.
pub const P2SH_VERSION: u8 = 0x05;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// The address kind a compact signature commits to, read from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Pay-to-pubkey-hash, header 27-34.
    P2pkh,
    /// Segwit v0 key hash nested in P2SH, header 35-38.
    P2shP2wpkh,
    /// Native segwit v0 key hash (bech32), header 39-42.
    P2wpkh,
}

impl WalletAddress {
    /// The mainnet P2PKH address of a public key.
    pub fn bitcoin(key: &VerifyingKey, compressed: bool) -> Self {
        let hash = hash160(key.to_encoded_point(compressed).as_bytes());
        Self::from_hash160(P2PKH_VERSION, &hash)
    }

    /// Base58check-encode a version byte and a 20-byte hash.
    pub fn from_hash160(version: u8, hash: &[u8; 20]) -> Self {
        let mut payload = [0u8; 21];
        payload[0] = version;
        payload[1..].copy_from_slice(hash);
        Self::new(bs58::encode(payload).with_check().into_string())
    }

    /// Decode a base58check address to the 20-byte hash it commits to.
    ///
    /// The version byte is not checked, so testnet and P2SH addresses decode
    /// as well.
    pub fn bitcoin_hash(&self) -> Result<[u8; 20], CoreError> {
        let payload = bs58::decode(self.as_str())
            .with_check(None)
            .into_vec()
            .map_err(|e| CoreError::MalformedAddress(format!("{}: {}", self, e)))?;
        payload
            .get(1..)
            .and_then(|hash| <[u8; 20]>::try_from(hash).ok())
            .ok_or_else(|| CoreError::MalformedAddress(format!("{}: expected 21 bytes", self)))
    }
}

/// A 65-byte compact recoverable signature: `header || r || s`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitcoinSignature {
    signature: Signature,
    recovery_id: RecoveryId,
    compressed: bool,
    kind: AddressKind,
}

impl BitcoinSignature {
    /// Create a P2PKH signature from a k256 signature and its recovery id.
    ///
    /// `compressed` selects the public key encoding the address was derived
    /// from.
    pub fn from_parts(signature: Signature, recovery_id: RecoveryId, compressed: bool) -> Self {
        Self {
            signature,
            recovery_id,
            compressed,
            kind: AddressKind::P2pkh,
        }
    }

    /// Parse from base64.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = BASE64
            .decode(s.trim())
            .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;
        if bytes.len() != 65 {
            return Err(CoreError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let flags = bytes[0]
            .checked_sub(27)
            .filter(|flags| *flags <= 15)
            .ok_or_else(|| {
                CoreError::MalformedSignature(format!("invalid header byte {}", bytes[0]))
            })?;
        let kind = match flags & 12 {
            0 | 4 => AddressKind::P2pkh,
            8 => AddressKind::P2shP2wpkh,
            _ => AddressKind::P2wpkh,
        };
        let recovery_id = RecoveryId::from_byte(flags & 3).ok_or_else(|| {
            CoreError::MalformedSignature(format!("invalid recovery id {}", flags & 3))
        })?;
        let signature = Signature::from_slice(&bytes[1..])
            .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;

        Ok(Self {
            signature,
            recovery_id,
            compressed: flags & 12 != 0,
            kind,
        })
    }

    /// Convert to base64.
    pub fn to_base64(&self) -> String {
        let kind_flags = match (self.kind, self.compressed) {
            (AddressKind::P2pkh, false) => 0,
            (AddressKind::P2pkh, true) => 4,
            (AddressKind::P2shP2wpkh, _) => 8,
            (AddressKind::P2wpkh, _) => 12,
        };
        let mut bytes = Vec::with_capacity(65);
        bytes.push(27 + kind_flags + self.recovery_id.to_byte());
        bytes.extend_from_slice(&self.signature.to_bytes());
        BASE64.encode(bytes)
    }

    /// The address kind named by the header byte.
    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    /// Recover the public key that produced this signature over `message`.
    pub fn recover(&self, message: &str) -> Option<VerifyingKey> {
        let prehash = bitcoin_message_hash(message);
        VerifyingKey::recover_from_prehash(&prehash, &self.signature, self.recovery_id).ok()
    }

    /// Check that `address` signed `message`.
    ///
    /// A signature from another key is `Ok(false)`. Native segwit
    /// signatures need a bech32 address and are refused as malformed.
    pub fn verify(&self, address: &WalletAddress, message: &str) -> Result<bool, CoreError> {
        if self.kind == AddressKind::P2wpkh {
            return Err(CoreError::MalformedSignature(
                "native segwit signatures are not supported".into(),
            ));
        }
        let expected = address.bitcoin_hash()?;

        let Some(key) = self.recover(message) else {
            return Ok(false);
        };
        let key_hash = hash160(key.to_encoded_point(self.compressed).as_bytes());
        let actual = match self.kind {
            AddressKind::P2shP2wpkh => hash160(&witness_program(&key_hash)),
            _ => key_hash,
        };
        Ok(actual == expected)
    }
}

impl fmt::Debug for BitcoinSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitcoinSignature({}...)", &self.to_base64()[..16])
    }
}

/// Double SHA-256 of a message under the "Bitcoin Signed Message" magic.
pub fn bitcoin_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MESSAGE_MAGIC);
    hasher.update(compact_size(message.len() as u64));
    hasher.update(message.as_bytes());
    Sha256::digest(hasher.finalize()).into()
}

/// RIPEMD-160 of SHA-256.
fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// The P2WPKH redeem script: `OP_0 PUSH20 <key hash>`.
fn witness_program(key_hash: &[u8; 20]) -> [u8; 22] {
    let mut script = [0u8; 22];
    script[1] = 0x14;
    script[2..].copy_from_slice(key_hash);
    script
}

/// Bitcoin's variable-length integer encoding.
fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}
