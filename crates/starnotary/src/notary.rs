//! The Notary: unified API for Star Notary.
//!
//! The Notary brings the ledger and the validation pool together behind the
//! operations a transport layer exposes to clients.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use starnotary_core::{BlockBody, BlockHash, Clock, SystemClock, WalletAddress};
use starnotary_ledger::Chain;
use starnotary_pool::{
    BitcoinVerifier, MessageVerifier, ValidationPool, ValidationRequest, ValidationStatus,
    Verification,
};
use starnotary_store::{SqliteStore, Store};

use crate::config::NotaryConfig;
use crate::error::{NotaryError, Result};
use crate::star::{StarBlock, StarSubmission};

/// The main Notary struct.
///
/// Provides a unified API for:
/// - Querying blocks by height, hash, and wallet address
/// - Issuing and verifying ownership challenges
/// - Registering stars for authorized addresses
/// - Re-verifying chain integrity
pub struct Notary<S: Store, V: MessageVerifier = BitcoinVerifier> {
    chain: Chain<S>,
    pool: ValidationPool<V>,
    config: NotaryConfig,
}

impl Notary<SqliteStore> {
    /// Open a notary backed by the SQLite database at `path`.
    pub async fn open_path(path: impl AsRef<Path>, config: NotaryConfig) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        Self::open(store, config).await
    }
}

impl<S: Store> Notary<S> {
    /// Open a notary on `store` using the system clock.
    pub async fn open(store: S, config: NotaryConfig) -> Result<Self> {
        Self::open_with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Open a notary on `store` with an explicit clock.
    pub async fn open_with_clock(
        store: S,
        config: NotaryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_verifier(store, config, clock, BitcoinVerifier).await
    }
}

impl<S: Store, V: MessageVerifier> Notary<S, V> {
    /// Open a notary with a custom signature check.
    ///
    /// Creates the genesis block if the store is empty.
    pub async fn with_verifier(
        store: S,
        config: NotaryConfig,
        clock: Arc<dyn Clock>,
        verifier: V,
    ) -> Result<Self> {
        let genesis = BlockBody::Genesis(config.genesis_body.clone());
        let chain = Chain::open_with_genesis(store, Arc::clone(&clock), genesis).await?;
        let pool = ValidationPool::with_verifier(config.pool.clone(), clock, verifier);

        Ok(Self {
            chain,
            pool,
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    /// Get the ledger.
    pub fn chain(&self) -> &Chain<S> {
        &self.chain
    }

    /// Get the validation pool.
    pub fn pool(&self) -> &ValidationPool<V> {
        &self.pool
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of blocks, genesis included.
    pub async fn height(&self) -> Result<u64> {
        Ok(self.chain.height().await?)
    }

    /// Get the block at `height`.
    pub async fn block_by_height(&self, height: u64) -> Result<Option<StarBlock>> {
        Ok(self.chain.get_by_height(height).await?.map(StarBlock::from))
    }

    /// Get a block by its hex hash. A malformed hash matches nothing.
    pub async fn block_by_hash(&self, hash: &str) -> Result<Option<StarBlock>> {
        let Ok(hash) = BlockHash::from_hex(hash) else {
            return Ok(None);
        };
        Ok(self.chain.get_by_hash(&hash).await?.map(StarBlock::from))
    }

    /// Get every star registered by `address`.
    pub async fn blocks_by_address(&self, address: &str) -> Result<Vec<StarBlock>> {
        let address = WalletAddress::new(address);
        Ok(self
            .chain
            .get_by_address(&address)
            .await?
            .into_iter()
            .map(StarBlock::from)
            .collect())
    }

    /// Re-verify the whole chain. An empty result means it is intact.
    pub async fn validate_chain(&self) -> Result<Vec<String>> {
        Ok(self.chain.validate_chain().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Open (or re-read) the ownership challenge for `address`.
    pub fn request_validation(&self, address: &str) -> Result<ValidationRequest> {
        Ok(self.pool.request_challenge(&WalletAddress::new(address))?)
    }

    /// Check a signed challenge, authorizing `address` to register one star.
    pub fn validate_signature(&self, address: &str, signature: &str) -> Result<ValidationStatus> {
        match self
            .pool
            .verify_signature(&WalletAddress::new(address), signature)?
        {
            Verification::Authorized(status) => Ok(status),
            Verification::Invalid => Err(NotaryError::InvalidSignature),
            Verification::Expired => Err(NotaryError::ValidationExpired),
        }
    }

    /// Register a star for an authorized address.
    ///
    /// An address without an authorization is refused before the star is
    /// looked at. A star over the field limits is refused without using up
    /// the authorization. Otherwise the authorization is used up, and given
    /// back if the block cannot be written.
    pub async fn submit_star(&self, address: &str, star: StarSubmission) -> Result<StarBlock> {
        let address = WalletAddress::new(address);
        if !self.pool.is_authorized(&address)? {
            return Err(NotaryError::Unauthorized(address));
        }
        star.validate()?;

        let Some(authorization) = self.pool.take_authorization(&address)? else {
            return Err(NotaryError::Unauthorized(address));
        };

        let body = BlockBody::star(address.clone(), star.into_star());
        match self.chain.append(body).await {
            Ok(block) => {
                info!(%address, height = block.height, hash = %block.hash, "registered star");
                Ok(StarBlock::from(block))
            }
            Err(e) => {
                self.pool.restore_authorization(authorization)?;
                Err(e.into())
            }
        }
    }
}
