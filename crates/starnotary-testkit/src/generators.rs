//! Proptest generators for property-based testing.

use proptest::prelude::*;

use starnotary_core::crypto::bitcoin::P2PKH_VERSION;
use starnotary_core::{Block, BlockBody, BlockHash, Star, WalletAddress};

/// Generate a well-formed mainnet P2PKH address.
pub fn wallet_address() -> impl Strategy<Value = WalletAddress> {
    any::<[u8; 20]>().prop_map(|hash| WalletAddress::from_hash160(P2PKH_VERSION, &hash))
}

/// Generate a right ascension string.
pub fn ra() -> impl Strategy<Value = String> {
    (0u8..24, 0u8..60, 0u16..6000)
        .prop_map(|(h, m, cs)| format!("{}h {}m {}.{:02}s", h, m, cs / 100, cs % 100))
}

/// Generate a declination string.
pub fn dec() -> impl Strategy<Value = String> {
    (-89i8..=89, 0u8..60, 0u8..60).prop_map(|(d, m, s)| format!("{}° {}' {}\"", d, m, s))
}

/// Generate a star with a free-text story.
pub fn star() -> impl Strategy<Value = Star> {
    (ra(), dec(), ".{0,250}").prop_map(|(ra, dec, story)| Star::new(ra, dec, &story))
}

/// Generate a star claim body.
pub fn star_body() -> impl Strategy<Value = BlockBody> {
    (wallet_address(), star()).prop_map(|(address, star)| BlockBody::star(address, star))
}

/// Generate a random BlockHash.
pub fn block_hash() -> impl Strategy<Value = BlockHash> {
    any::<[u8; 32]>().prop_map(BlockHash::from_bytes)
}

/// Generate a reasonable Unix time in seconds.
pub fn time() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800
}

/// Generate a sealed block at a positive height.
pub fn sealed_block() -> impl Strategy<Value = Block> {
    (star_body(), 1u64..1_000_000, time(), block_hash())
        .prop_map(|(body, height, time, prev)| Block::new(body).seal(height, time, Some(prev)))
}
