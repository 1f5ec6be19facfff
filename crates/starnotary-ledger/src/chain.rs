//! The Chain: append-only, hash-linked sequence of blocks.
//!
//! Blocks are stored one per height as their canonical bytes. Hash and
//! address lookups scan the whole store.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use starnotary_core::{
    canonical_block_bytes, decode_block, Block, BlockBody, BlockHash, Clock, WalletAddress,
};
use starnotary_store::Store;

use crate::error::{LedgerError, Result};

/// One integrity failure found by [`Chain::faults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFault {
    /// The block at this height is missing, undecodable, or its hash does
    /// not match its content.
    InvalidBlock(u64),
    /// The block after this height does not point at this block's hash.
    BrokenLink(u64),
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::InvalidBlock(h) => write!(f, "Block {} is not valid.", h),
            ChainFault::BrokenLink(h) => {
                write!(f, "Link between blocks {} and {} is not valid.", h, h + 1)
            }
        }
    }
}

/// The ledger.
///
/// Appends are serialized through an internal lock so that no two blocks
/// are ever given the same height. Reads never take the lock.
pub struct Chain<S: Store> {
    store: S,
    clock: Arc<dyn Clock>,
    append_lock: Mutex<()>,
}

impl<S: Store> Chain<S> {
    /// Open the chain, creating the genesis block if the store is empty.
    pub async fn open(store: S, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open_with_genesis(store, clock, BlockBody::genesis()).await
    }

    /// Open the chain with a custom genesis body.
    ///
    /// The body only matters the first time a store is opened.
    pub async fn open_with_genesis(
        store: S,
        clock: Arc<dyn Clock>,
        genesis: BlockBody,
    ) -> Result<Self> {
        let chain = Self {
            store,
            clock,
            append_lock: Mutex::new(()),
        };

        if chain.height().await? == 0 {
            let block = chain.append(genesis).await?;
            info!(hash = %block.hash, time = block.time, "created genesis block");
        } else {
            debug!("genesis block already exists");
        }

        Ok(chain)
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of persisted blocks.
    pub async fn height(&self) -> Result<u64> {
        Ok(self.store.count().await?)
    }

    /// Append a block carrying `body`.
    ///
    /// Assigns height, time, previous hash and hash, then persists the block
    /// with a single store write.
    pub async fn append(&self, body: BlockBody) -> Result<Block> {
        let _guard = self.append_lock.lock().await;

        let height = self.store.count().await?;
        let previous = match height.checked_sub(1) {
            Some(prev) => Some(self.require(prev).await?.hash),
            None => None,
        };

        let block = Block::new(body).seal(height, self.clock.now(), previous);
        self.store
            .put(height, &canonical_block_bytes(&block))
            .await?;

        debug!(height, hash = %block.hash, "appended block");
        Ok(block)
    }

    /// Get the block at `height`.
    pub async fn get_by_height(&self, height: u64) -> Result<Option<Block>> {
        match self.store.get(height).await? {
            Some(bytes) => Ok(Some(decode(height, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Get the block whose hash is `hash`.
    pub async fn get_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>> {
        Ok(self
            .scan_blocks()
            .await?
            .into_iter()
            .find(|block| block.hash == *hash))
    }

    /// Get every block registered by `address`, by ascending height.
    ///
    /// The genesis block has no address and is never returned.
    pub async fn get_by_address(&self, address: &WalletAddress) -> Result<Vec<Block>> {
        Ok(self
            .scan_blocks()
            .await?
            .into_iter()
            .filter(|block| !block.is_genesis() && block.address() == Some(address))
            .collect())
    }

    /// Get the most recently appended block.
    pub async fn tip(&self) -> Result<Option<Block>> {
        match self.height().await?.checked_sub(1) {
            Some(last) => self.get_by_height(last).await,
            None => Ok(None),
        }
    }

    /// Check that the stored hash of the block at `height` matches its content.
    ///
    /// An entry that does not decode is an invalid block, not an error.
    pub async fn validate_block(&self, height: u64) -> Result<bool> {
        Ok(self
            .require_decoded(height)
            .await?
            .is_some_and(|block| block.has_valid_hash()))
    }

    /// Check that the block at `height + 1` points at the block at `height`.
    ///
    /// A link with an undecodable entry at either end is broken.
    pub async fn validate_link(&self, height: u64) -> Result<bool> {
        let block = self.require_decoded(height).await?;
        let next = self.require_decoded(height + 1).await?;
        Ok(match (block, next) {
            (Some(block), Some(next)) => next.links_to(&block),
            _ => false,
        })
    }

    /// Re-verify every block and every link.
    ///
    /// Block faults come first, in height order, then link faults. An
    /// undecodable entry counts as an invalid block and breaks both of its
    /// links.
    pub async fn faults(&self) -> Result<Vec<ChainFault>> {
        let blocks: BTreeMap<u64, Option<Block>> = self
            .store
            .scan()
            .await?
            .into_iter()
            .map(|(height, bytes)| (height, decode_or_warn(height, &bytes)))
            .collect();
        let count = blocks.len() as u64;
        let at = |h: u64| blocks.get(&h).and_then(Option::as_ref);

        let mut faults = Vec::new();
        for h in 0..count {
            if !at(h).is_some_and(Block::has_valid_hash) {
                faults.push(ChainFault::InvalidBlock(h));
            }
        }
        for h in 0..count.saturating_sub(1) {
            let linked = match (at(h), at(h + 1)) {
                (Some(block), Some(next)) => next.links_to(block),
                _ => false,
            };
            if !linked {
                faults.push(ChainFault::BrokenLink(h));
            }
        }

        Ok(faults)
    }

    /// Re-verify the chain, returning one message per fault.
    ///
    /// An empty result means the chain is intact.
    pub async fn validate_chain(&self) -> Result<Vec<String>> {
        let faults = self.faults().await?;
        for fault in &faults {
            warn!(%fault, "chain integrity fault");
        }
        Ok(faults.iter().map(ToString::to_string).collect())
    }

    /// Overwrite the block at `height` verbatim, without re-hashing.
    ///
    /// For corruption tests only.
    pub async fn tamper_block(&self, height: u64, block: &Block) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        self.store
            .put(height, &canonical_block_bytes(block))
            .await?;
        warn!(height, "block overwritten out of band");
        Ok(())
    }

    async fn require(&self, height: u64) -> Result<Block> {
        self.get_by_height(height)
            .await?
            .ok_or(LedgerError::BlockNotFound(height))
    }

    /// The block at `height`, or `None` if its entry does not decode.
    async fn require_decoded(&self, height: u64) -> Result<Option<Block>> {
        let bytes = self
            .store
            .get(height)
            .await?
            .ok_or(LedgerError::BlockNotFound(height))?;
        Ok(decode_or_warn(height, &bytes))
    }

    /// All decodable blocks, by ascending height.
    async fn scan_blocks(&self) -> Result<Vec<Block>> {
        Ok(self
            .store
            .scan()
            .await?
            .into_iter()
            .filter_map(|(height, bytes)| decode_or_warn(height, &bytes))
            .collect())
    }
}

fn decode(height: u64, bytes: &[u8]) -> Result<Block> {
    decode_block(bytes).map_err(|e| LedgerError::CorruptBlock {
        height,
        reason: e.to_string(),
    })
}

fn decode_or_warn(height: u64, bytes: &[u8]) -> Option<Block> {
    match decode(height, bytes) {
        Ok(block) => Some(block),
        Err(e) => {
            warn!(height, error = %e, "skipping undecodable block");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starnotary_core::{ManualClock, Star, GENESIS_BODY};
    use starnotary_store::{MemoryStore, SqliteStore, StoreError};
    use starnotary_testkit::{generators, FailingStore, TestWallet};

    const T0: i64 = 1_541_605_128;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(T0))
    }

    fn star_body(wallet: &TestWallet, n: usize) -> BlockBody {
        BlockBody::star(
            wallet.address().clone(),
            Star::new(format!("{}h", n), "-26° 29' 24", &format!("star number {}", n)),
        )
    }

    async fn chain_with(n: usize) -> Chain<MemoryStore> {
        let chain = Chain::open(MemoryStore::new(), clock()).await.unwrap();
        let wallet = TestWallet::from_seed(1);
        for i in 0..n {
            chain.append(star_body(&wallet, i)).await.unwrap();
        }
        chain
    }

    #[tokio::test]
    async fn test_genesis_created_on_empty_store() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let chain = Chain::open(MemoryStore::new(), clock()).await.unwrap();

        assert_eq!(chain.height().await.unwrap(), 1);
        let genesis = chain.get_by_height(0).await.unwrap().unwrap();
        assert_eq!(genesis.body, BlockBody::Genesis(GENESIS_BODY.to_string()));
        assert_eq!(genesis.previous_block_hash, None);
        assert_eq!(genesis.time, T0);
        assert!(genesis.has_valid_hash());
    }

    #[tokio::test]
    async fn test_genesis_idempotent_across_reopen() {
        let store = Arc::new(MemoryStore::new());
        let first = Chain::open(Arc::clone(&store), clock()).await.unwrap();
        let genesis = first.get_by_height(0).await.unwrap().unwrap();
        first
            .append(star_body(&TestWallet::from_seed(1), 0))
            .await
            .unwrap();
        drop(first);

        let later = Arc::new(ManualClock::new(T0 + 3600));
        let second = Chain::open(Arc::clone(&store), later).await.unwrap();
        assert_eq!(second.height().await.unwrap(), 2);
        assert_eq!(second.get_by_height(0).await.unwrap().unwrap(), genesis);
        assert!(second.validate_chain().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_genesis_body() {
        let chain = Chain::open_with_genesis(
            MemoryStore::new(),
            clock(),
            BlockBody::Genesis("First light".into()),
        )
        .await
        .unwrap();
        let genesis = chain.tip().await.unwrap().unwrap();
        assert_eq!(genesis.body, BlockBody::Genesis("First light".into()));
    }

    #[tokio::test]
    async fn test_append_assigns_height_time_and_link() {
        let clock = clock();
        let chain = Chain::open(MemoryStore::new(), clock.clone()).await.unwrap();
        let wallet = TestWallet::from_seed(1);

        let genesis = chain.tip().await.unwrap().unwrap();
        clock.advance(42);
        let block = chain.append(star_body(&wallet, 1)).await.unwrap();

        assert_eq!(block.height, 1);
        assert_eq!(block.time, T0 + 42);
        assert_eq!(block.previous_block_hash, Some(genesis.hash));
        assert!(!block.hash.is_zero());
        assert!(block.has_valid_hash());

        let height = chain.height().await.unwrap();
        assert_eq!(chain.get_by_height(height - 1).await.unwrap(), Some(block.clone()));
        assert_eq!(chain.get_by_height(height).await.unwrap(), None);
        assert_eq!(chain.tip().await.unwrap(), Some(block));
    }

    #[tokio::test]
    async fn test_get_by_hash() {
        let chain = chain_with(3).await;
        let second = chain.get_by_height(2).await.unwrap().unwrap();

        assert_eq!(chain.get_by_hash(&second.hash).await.unwrap(), Some(second));
        assert_eq!(
            chain
                .get_by_hash(&BlockHash::from_bytes([0xee; 32]))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_get_by_address() {
        let chain = Chain::open(MemoryStore::new(), clock()).await.unwrap();
        let alice = TestWallet::from_seed(1);
        let bob = TestWallet::from_seed(2);

        chain.append(star_body(&alice, 1)).await.unwrap();
        chain.append(star_body(&bob, 2)).await.unwrap();
        chain.append(star_body(&alice, 3)).await.unwrap();

        let heights: Vec<u64> = chain
            .get_by_address(alice.address())
            .await
            .unwrap()
            .iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(heights, vec![1, 3]);

        assert_eq!(chain.get_by_address(bob.address()).await.unwrap().len(), 1);
        assert!(chain
            .get_by_address(TestWallet::from_seed(3).address())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_appended_chain_is_valid() {
        let chain = chain_with(5).await;
        assert!(chain.validate_chain().await.unwrap().is_empty());
        for h in 0..6 {
            assert!(chain.validate_block(h).await.unwrap());
        }
        for h in 0..5 {
            assert!(chain.validate_link(h).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_tampered_body_invalidates_block_only() {
        let chain = chain_with(4).await;
        let mut block = chain.get_by_height(2).await.unwrap().unwrap();
        if let BlockBody::Star(claim) = &mut block.body {
            claim.star.story = hex_story("a different story");
        }
        chain.tamper_block(2, &block).await.unwrap();

        assert!(!chain.validate_block(2).await.unwrap());
        assert!(chain.validate_block(1).await.unwrap());
        assert_eq!(
            chain.validate_chain().await.unwrap(),
            vec!["Block 2 is not valid.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tampered_link_breaks_exactly_one_link() {
        let chain = chain_with(4).await;
        let k = 3;
        let mut block = chain.get_by_height(k).await.unwrap().unwrap();
        block.previous_block_hash = Some(BlockHash::from_bytes([0xab; 32]));
        chain.tamper_block(k, &block).await.unwrap();

        for h in 0..4 {
            assert_eq!(chain.validate_link(h).await.unwrap(), h != k - 1, "link {}", h);
        }
        assert_eq!(
            chain.validate_chain().await.unwrap(),
            vec![
                "Block 3 is not valid.".to_string(),
                "Link between blocks 2 and 3 is not valid.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rehashed_tamper_breaks_following_link() {
        let chain = chain_with(3).await;
        let mut block = chain.get_by_height(1).await.unwrap().unwrap();
        block.time += 1;
        block.hash = block.compute_hash();
        chain.tamper_block(1, &block).await.unwrap();

        assert_eq!(
            chain.faults().await.unwrap(),
            vec![ChainFault::BrokenLink(1)]
        );
    }

    #[tokio::test]
    async fn test_validate_missing_height() {
        let chain = chain_with(1).await;
        assert!(matches!(
            chain.validate_block(2).await,
            Err(LedgerError::BlockNotFound(2))
        ));
        assert!(matches!(
            chain.validate_link(1).await,
            Err(LedgerError::BlockNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_entry() {
        let store = Arc::new(MemoryStore::new());
        let chain = Chain::open(Arc::clone(&store), clock()).await.unwrap();
        let wallet = TestWallet::from_seed(1);
        chain.append(star_body(&wallet, 1)).await.unwrap();
        chain.append(star_body(&wallet, 2)).await.unwrap();

        store.put(1, b"not a block").await.unwrap();

        assert!(matches!(
            chain.get_by_height(1).await,
            Err(LedgerError::CorruptBlock { height: 1, .. })
        ));
        assert_eq!(
            chain.faults().await.unwrap(),
            vec![
                ChainFault::InvalidBlock(1),
                ChainFault::BrokenLink(0),
                ChainFault::BrokenLink(1),
            ]
        );
        // Scans skip the bad entry and keep serving reads.
        assert_eq!(chain.get_by_address(wallet.address()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_entry_fails_validation_without_error() {
        let store = Arc::new(MemoryStore::new());
        let chain = Chain::open(Arc::clone(&store), clock()).await.unwrap();
        let wallet = TestWallet::from_seed(1);
        chain.append(star_body(&wallet, 1)).await.unwrap();
        chain.append(star_body(&wallet, 2)).await.unwrap();

        store.put(1, b"garbage").await.unwrap();

        assert!(!chain.validate_block(1).await.unwrap());
        assert!(!chain.validate_link(0).await.unwrap());
        assert!(!chain.validate_link(1).await.unwrap());
        assert!(chain.validate_block(0).await.unwrap());
        assert!(chain.validate_block(2).await.unwrap());

        // Per-height checks agree with the whole-chain report.
        assert_eq!(
            chain.validate_chain().await.unwrap(),
            vec![
                "Block 1 is not valid.".to_string(),
                "Link between blocks 0 and 1 is not valid.".to_string(),
                "Link between blocks 1 and 2 is not valid.".to_string(),
            ]
        );

        // Heights past the tip are still missing, not invalid.
        assert!(matches!(
            chain.validate_link(2).await,
            Err(LedgerError::BlockNotFound(3))
        ));
    }

    #[tokio::test]
    async fn test_store_errors_propagate_and_chain_recovers() {
        let store = Arc::new(FailingStore::new());
        let chain = Chain::open(Arc::clone(&store), clock()).await.unwrap();
        let wallet = TestWallet::from_seed(1);

        store.fail_writes(true);
        assert!(matches!(
            chain.append(star_body(&wallet, 1)).await,
            Err(LedgerError::Store(StoreError::Io(_)))
        ));

        store.fail_reads(true);
        assert!(chain.height().await.is_err());
        assert!(chain.get_by_hash(&BlockHash::ZERO).await.is_err());

        store.fail_reads(false);
        store.fail_writes(false);
        let block = chain.append(star_body(&wallet, 1)).await.unwrap();
        assert_eq!(block.height, 1);
        assert!(chain.validate_chain().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_fails_loudly() {
        let store = FailingStore::new();
        store.fail_writes(true);
        assert!(Chain::open(store, clock()).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_get_distinct_heights() {
        let chain = Arc::new(Chain::open(MemoryStore::new(), clock()).await.unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let chain = Arc::clone(&chain);
                tokio::spawn(async move {
                    let wallet = TestWallet::from_seed(i as u64);
                    chain.append(star_body(&wallet, i)).await.unwrap().height
                })
            })
            .collect();

        let mut heights = Vec::new();
        for handle in handles {
            heights.push(handle.await.unwrap());
        }
        heights.sort_unstable();

        assert_eq!(heights, (1..=16).collect::<Vec<u64>>());
        assert_eq!(chain.height().await.unwrap(), 17);
        assert!(chain.validate_chain().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_chain_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notary.db");
        let wallet = TestWallet::from_seed(5);

        let tip = {
            let chain = Chain::open(SqliteStore::open(&path).unwrap(), clock())
                .await
                .unwrap();
            chain.append(star_body(&wallet, 1)).await.unwrap();
            chain.append(star_body(&wallet, 2)).await.unwrap()
        };

        let chain = Chain::open(SqliteStore::open(&path).unwrap(), clock())
            .await
            .unwrap();
        assert_eq!(chain.height().await.unwrap(), 3);
        assert_eq!(chain.tip().await.unwrap(), Some(tip));
        assert_eq!(chain.get_by_address(wallet.address()).await.unwrap().len(), 2);
        assert!(chain.validate_chain().await.unwrap().is_empty());
    }

    #[test]
    fn test_fault_messages() {
        assert_eq!(ChainFault::InvalidBlock(4).to_string(), "Block 4 is not valid.");
        assert_eq!(
            ChainFault::BrokenLink(4).to_string(),
            "Link between blocks 4 and 5 is not valid."
        );
    }

    fn hex_story(s: &str) -> String {
        Star::new("", "", s).story
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn prop_appended_chains_validate(
            bodies in proptest::collection::vec(generators::star_body(), 0..12),
            corrupt in proptest::prelude::any::<proptest::sample::Index>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let chain = Chain::open(MemoryStore::new(), clock()).await.unwrap();
                for body in bodies.iter().cloned() {
                    chain.append(body).await.unwrap();
                }
                let height = chain.height().await.unwrap();
                assert_eq!(height, bodies.len() as u64 + 1);
                assert!(chain.validate_chain().await.unwrap().is_empty());

                let k = corrupt.index(height as usize) as u64;
                let mut block = chain.get_by_height(k).await.unwrap().unwrap();
                block.time += 1;
                chain.tamper_block(k, &block).await.unwrap();
                assert!(!chain.validate_block(k).await.unwrap());
                assert_eq!(chain.faults().await.unwrap(), vec![ChainFault::InvalidBlock(k)]);
            });
        }
    }
}
