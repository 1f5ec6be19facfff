//! Block: one immutable entry of the append-only chain.
//!
//! A block is built with [`Block::new`] and only becomes part of the chain
//! once the ledger assigns its height, time, link and hash.

use serde::{Deserialize, Serialize};

use crate::canonical::hashing_bytes;
use crate::crypto::WalletAddress;
use crate::types::{optional_hash, BlockHash};

/// The current block schema version.
pub const BLOCK_VERSION: u64 = 0;

/// Body of the genesis block.
pub const GENESIS_BODY: &str = "Genesis Block";

/// Celestial coordinates and story of a registered star.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star {
    /// Right ascension, as submitted.
    pub ra: String,

    /// Declination, as submitted.
    pub dec: String,

    /// Hex encoding of the story bytes.
    pub story: String,
}

impl Star {
    /// Create a star from a plain-text story, hex encoding it.
    pub fn new(ra: impl Into<String>, dec: impl Into<String>, story: &str) -> Self {
        Self {
            ra: ra.into(),
            dec: dec.into(),
            story: hex::encode(story.as_bytes()),
        }
    }

    /// Decode the stored story back to text.
    ///
    /// Invalid hex yields an empty string; invalid UTF-8 is replaced lossily.
    pub fn story_decoded(&self) -> String {
        hex::decode(&self.story)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

/// A star claim bound to the wallet that registered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarClaim {
    pub address: WalletAddress,
    pub star: Star,
}

/// The payload carried by a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockBody {
    /// User block carrying a star claim.
    Star(StarClaim),
    /// Sentinel payload of the block at height 0.
    Genesis(String),
}

impl BlockBody {
    /// The fixed genesis payload.
    pub fn genesis() -> Self {
        BlockBody::Genesis(GENESIS_BODY.to_string())
    }

    /// Build a star claim body.
    pub fn star(address: WalletAddress, star: Star) -> Self {
        BlockBody::Star(StarClaim { address, star })
    }

    /// The address of a star claim, `None` for genesis.
    pub fn address(&self) -> Option<&WalletAddress> {
        match self {
            BlockBody::Star(claim) => Some(&claim.address),
            BlockBody::Genesis(_) => None,
        }
    }
}

/// A block of the chain.
///
/// `hash` covers every other field; see [`crate::canonical`] for the exact
/// bytes that are hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Content hash (`BlockHash::ZERO` until sealed).
    pub hash: BlockHash,

    /// Position in the chain, 0 for genesis.
    pub height: u64,

    /// The payload.
    pub body: BlockBody,

    /// Unix seconds at append time.
    pub time: i64,

    /// Hash of the block at `height - 1` (None at height 0).
    #[serde(with = "optional_hash")]
    pub previous_block_hash: Option<BlockHash>,
}

impl Block {
    /// Create an unsealed block carrying `body`.
    pub fn new(body: BlockBody) -> Self {
        Self {
            hash: BlockHash::ZERO,
            height: 0,
            body,
            time: 0,
            previous_block_hash: None,
        }
    }

    /// Compute the content hash, ignoring the current `hash` field.
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::digest(&hashing_bytes(self))
    }

    /// Assign height, time and link, then compute the hash.
    pub fn seal(mut self, height: u64, time: i64, previous: Option<BlockHash>) -> Self {
        self.height = height;
        self.time = time;
        self.previous_block_hash = previous;
        self.hash = self.compute_hash();
        self
    }

    /// Check that the stored hash matches the content.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Check that this block points at `previous`.
    pub fn links_to(&self, previous: &Block) -> bool {
        self.previous_block_hash == Some(previous.hash)
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// The wallet address of a star block.
    pub fn address(&self) -> Option<&WalletAddress> {
        self.body.address()
    }

    /// The star of a star block.
    pub fn star(&self) -> Option<&Star> {
        match &self.body {
            BlockBody::Star(claim) => Some(&claim.star),
            BlockBody::Genesis(_) => None,
        }
    }
}
