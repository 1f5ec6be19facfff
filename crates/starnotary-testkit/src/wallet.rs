//! Client-side wallets for tests.

use k256::ecdsa::SigningKey;

use starnotary_core::{
    bitcoin_message_hash, personal_message_hash, BitcoinSignature, EthereumSignature,
    WalletAddress,
};

/// A secp256k1 wallet that signs challenge messages.
///
/// Signs like a Bitcoin client by default: a compressed-key P2PKH address
/// and base64 compact signatures. The `ethereum_*` methods give the same
/// key's Ethereum identity.
#[derive(Clone)]
pub struct TestWallet {
    key: SigningKey,
    address: WalletAddress,
    ethereum_address: WalletAddress,
}

impl TestWallet {
    /// Create a wallet with a random key.
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Create a deterministic wallet. Distinct seeds give distinct wallets.
    pub fn from_seed(seed: u64) -> Self {
        let mut secret = [0u8; 32];
        secret[0] = 0x01;
        secret[24..].copy_from_slice(&seed.to_be_bytes());
        let key = SigningKey::from_slice(&secret).expect("seeded scalar is in range");
        Self::from_key(key)
    }

    fn from_key(key: SigningKey) -> Self {
        let address = WalletAddress::bitcoin(key.verifying_key(), true);
        let ethereum_address = WalletAddress::ethereum(key.verifying_key());
        Self {
            key,
            address,
            ethereum_address,
        }
    }

    /// The wallet's Bitcoin address.
    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Sign `message`, returning the base64 signature a client would submit.
    pub fn sign(&self, message: &str) -> String {
        self.signature(message).to_base64()
    }

    /// Sign `message`, returning the parsed signature.
    pub fn signature(&self, message: &str) -> BitcoinSignature {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&bitcoin_message_hash(message))
            .expect("prehash signing cannot fail for a 32-byte digest");
        BitcoinSignature::from_parts(signature, recovery_id, true)
    }

    /// The wallet's Ethereum address.
    pub fn ethereum_address(&self) -> &WalletAddress {
        &self.ethereum_address
    }

    /// Sign `message` as an Ethereum personal message, returning hex.
    pub fn sign_ethereum(&self, message: &str) -> String {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&personal_message_hash(message))
            .expect("prehash signing cannot fail for a 32-byte digest");
        EthereumSignature::from_parts(signature, recovery_id).to_hex()
    }
}

impl std::fmt::Debug for TestWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
