//! Star submissions and the block view returned to clients.

use serde::{Deserialize, Serialize, Serializer};

use starnotary_core::{Block, BlockBody, BlockHash, Star, WalletAddress};

use crate::error::{NotaryError, Result};

/// Longest accepted right ascension or declination, in characters.
pub const MAX_COORDINATE_LEN: usize = 12;

/// Longest accepted story, in characters.
pub const MAX_STORY_LEN: usize = 250;

/// A star as submitted by a client, with a plain-text story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarSubmission {
    pub ra: String,
    pub dec: String,
    pub story: String,
}

impl StarSubmission {
    pub fn new(ra: impl Into<String>, dec: impl Into<String>, story: impl Into<String>) -> Self {
        Self {
            ra: ra.into(),
            dec: dec.into(),
            story: story.into(),
        }
    }

    /// Check the field limits.
    pub fn validate(&self) -> Result<()> {
        check_len("ra", &self.ra, MAX_COORDINATE_LEN)?;
        check_len("dec", &self.dec, MAX_COORDINATE_LEN)?;
        check_len("story", &self.story, MAX_STORY_LEN)
    }

    /// Convert to the stored form, hex encoding the story.
    pub fn into_star(self) -> Star {
        Star::new(self.ra, self.dec, &self.story)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(NotaryError::InvalidSubmission(format!("{} is required", field)));
    }
    let len = value.chars().count();
    if len > max {
        return Err(NotaryError::InvalidSubmission(format!(
            "{} is {} characters, at most {} allowed",
            field, len, max
        )));
    }
    Ok(())
}

/// A block as shown to clients.
///
/// Serializes like [`Block`], with the star's story also given in plain
/// text as `storyDecoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarBlock(Block);

impl StarBlock {
    /// The underlying block.
    pub fn block(&self) -> &Block {
        &self.0
    }

    /// Unwrap the underlying block.
    pub fn into_block(self) -> Block {
        self.0
    }

    /// The decoded story of a star block, `None` for genesis.
    pub fn story_decoded(&self) -> Option<String> {
        self.0.star().map(Star::story_decoded)
    }
}

impl From<Block> for StarBlock {
    fn from(block: Block) -> Self {
        Self(block)
    }
}

impl std::ops::Deref for StarBlock {
    type Target = Block;

    fn deref(&self) -> &Block {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockView<'a> {
    hash: &'a BlockHash,
    height: u64,
    body: BodyView<'a>,
    time: i64,
    #[serde(serialize_with = "starnotary_core::types::optional_hash::serialize")]
    previous_block_hash: Option<BlockHash>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum BodyView<'a> {
    Star {
        address: &'a WalletAddress,
        star: StarView<'a>,
    },
    Genesis(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StarView<'a> {
    ra: &'a str,
    dec: &'a str,
    story: &'a str,
    story_decoded: String,
}

impl Serialize for StarBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let block = &self.0;
        let body = match &block.body {
            BlockBody::Star(claim) => BodyView::Star {
                address: &claim.address,
                star: StarView {
                    ra: &claim.star.ra,
                    dec: &claim.star.dec,
                    story: &claim.star.story,
                    story_decoded: claim.star.story_decoded(),
                },
            },
            BlockBody::Genesis(text) => BodyView::Genesis(text),
        };

        BlockView {
            hash: &block.hash,
            height: block.height,
            body,
            time: block.time,
            previous_block_hash: block.previous_block_hash,
        }
        .serialize(serializer)
    }
}
