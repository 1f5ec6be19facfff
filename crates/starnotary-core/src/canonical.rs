//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (times are i64 seconds)
//!
//! The same bytes are what the store persists and, with the hash field
//! forced to [`BlockHash::ZERO`], what the block hash is computed over.
//! Changing this layout invalidates every stored hash.

use ciborium::value::Value;

use crate::block::{Block, BlockBody, Star, StarClaim, BLOCK_VERSION};
use crate::crypto::WalletAddress;
use crate::error::CoreError;
use crate::types::BlockHash;

/// Block field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const HEIGHT: u64 = 1;
    pub const TIME: u64 = 2;
    pub const PREVIOUS_BLOCK_HASH: u64 = 3;
    pub const BODY: u64 = 4;
    pub const HASH: u64 = 5;
}

/// Body field keys.
mod body_keys {
    pub const KIND: u64 = 0;
    pub const GENESIS_TEXT: u64 = 1;
    pub const ADDRESS: u64 = 1;
    pub const RA: u64 = 2;
    pub const DEC: u64 = 3;
    pub const STORY: u64 = 4;

    pub const KIND_GENESIS: u64 = 0;
    pub const KIND_STAR: u64 = 1;
}

/// The subset of CBOR a block needs.
enum Cbor<'a> {
    Uint(u64),
    Int(i64),
    Bytes(&'a [u8]),
    Text(&'a str),
    Null,
    Map(Vec<(u64, Cbor<'a>)>),
}

/// Encode a block, including its stored hash, to canonical bytes.
///
/// This is the persisted form of a block.
pub fn canonical_block_bytes(block: &Block) -> Vec<u8> {
    encode_block(block, &block.hash)
}

/// Encode a block with its hash cleared: the input to the block hash.
pub fn hashing_bytes(block: &Block) -> Vec<u8> {
    encode_block(block, &BlockHash::ZERO)
}

fn encode_block(block: &Block, hash: &BlockHash) -> Vec<u8> {
    let previous = match &block.previous_block_hash {
        Some(h) => Cbor::Bytes(h.as_bytes()),
        None => Cbor::Null,
    };

    let value = Cbor::Map(vec![
        (keys::VERSION, Cbor::Uint(BLOCK_VERSION)),
        (keys::HEIGHT, Cbor::Uint(block.height)),
        (keys::TIME, Cbor::Int(block.time)),
        (keys::PREVIOUS_BLOCK_HASH, previous),
        (keys::BODY, body_to_cbor(&block.body)),
        (keys::HASH, Cbor::Bytes(hash.as_bytes())),
    ]);

    let mut buf = Vec::with_capacity(128);
    encode_value_to(&mut buf, &value);
    buf
}

fn body_to_cbor(body: &BlockBody) -> Cbor<'_> {
    match body {
        BlockBody::Genesis(text) => Cbor::Map(vec![
            (body_keys::KIND, Cbor::Uint(body_keys::KIND_GENESIS)),
            (body_keys::GENESIS_TEXT, Cbor::Text(text)),
        ]),
        BlockBody::Star(claim) => Cbor::Map(vec![
            (body_keys::KIND, Cbor::Uint(body_keys::KIND_STAR)),
            (body_keys::ADDRESS, Cbor::Text(claim.address.as_str())),
            (body_keys::RA, Cbor::Text(&claim.star.ra)),
            (body_keys::DEC, Cbor::Text(&claim.star.dec)),
            (body_keys::STORY, Cbor::Text(&claim.star.story)),
        ]),
    }
}

/// Recursively encode a value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Cbor<'_>) {
    match value {
        Cbor::Uint(n) => encode_uint(buf, 0, *n),
        Cbor::Int(n) => encode_int(buf, *n),
        Cbor::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Cbor::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Cbor::Null => buf.push(0xf6),
        Cbor::Map(entries) => encode_map_canonical(buf, entries),
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(u64, Cbor<'_>)]) {
    let mut pairs: Vec<(Vec<u8>, &Cbor<'_>)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(9);
            encode_uint(&mut key_buf, 0, *k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode a block from its persisted canonical bytes.
///
/// Rejects unknown versions and any encoding that does not re-encode to
/// the exact same bytes.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CoreError> {
    let value: Value =
        ciborium::de::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let entries = as_map(&value, "block")?;

    let version = get_uint(entries, keys::VERSION, "version")?;
    if version != BLOCK_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let height = get_uint(entries, keys::HEIGHT, "height")?;
    let time = get_int(entries, keys::TIME, "time")?;

    let previous_block_hash = match get_field(entries, keys::PREVIOUS_BLOCK_HASH, "previous_block_hash")? {
        Value::Null => None,
        other => Some(as_hash(other, "previous_block_hash")?),
    };

    let body = decode_body(get_field(entries, keys::BODY, "body")?)?;
    let hash = as_hash(get_field(entries, keys::HASH, "hash")?, "hash")?;

    let block = Block {
        hash,
        height,
        body,
        time,
        previous_block_hash,
    };

    if canonical_block_bytes(&block) != bytes {
        return Err(CoreError::MalformedBlock("non-canonical encoding".into()));
    }

    Ok(block)
}

fn decode_body(value: &Value) -> Result<BlockBody, CoreError> {
    let entries = as_map(value, "body")?;

    match get_uint(entries, body_keys::KIND, "body kind")? {
        body_keys::KIND_GENESIS => Ok(BlockBody::Genesis(get_text(
            entries,
            body_keys::GENESIS_TEXT,
            "genesis text",
        )?)),
        body_keys::KIND_STAR => Ok(BlockBody::Star(StarClaim {
            address: WalletAddress::new(get_text(entries, body_keys::ADDRESS, "address")?),
            star: Star {
                ra: get_text(entries, body_keys::RA, "ra")?,
                dec: get_text(entries, body_keys::DEC, "dec")?,
                story: get_text(entries, body_keys::STORY, "story")?,
            },
        })),
        other => Err(CoreError::MalformedBlock(format!("unknown body kind {}", other))),
    }
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)], CoreError> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(CoreError::MalformedBlock(format!("{} is not a map", what))),
    }
}

fn get_field<'a>(entries: &'a [(Value, Value)], key: u64, what: &str) -> Result<&'a Value, CoreError> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
        .map(|(_, v)| v)
        .ok_or_else(|| CoreError::MalformedBlock(format!("missing {}", what)))
}

fn get_uint(entries: &[(Value, Value)], key: u64, what: &str) -> Result<u64, CoreError> {
    match get_field(entries, key, what)? {
        Value::Integer(i) => u64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedBlock(format!("{} out of range", what))),
        _ => Err(CoreError::MalformedBlock(format!("{} is not an integer", what))),
    }
}

fn get_int(entries: &[(Value, Value)], key: u64, what: &str) -> Result<i64, CoreError> {
    match get_field(entries, key, what)? {
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedBlock(format!("{} out of range", what))),
        _ => Err(CoreError::MalformedBlock(format!("{} is not an integer", what))),
    }
}

fn get_text(entries: &[(Value, Value)], key: u64, what: &str) -> Result<String, CoreError> {
    match get_field(entries, key, what)? {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(CoreError::MalformedBlock(format!("{} is not text", what))),
    }
}

fn as_hash(value: &Value, what: &str) -> Result<BlockHash, CoreError> {
    match value {
        Value::Bytes(b) => BlockHash::try_from(b.as_slice())
            .map_err(|_| CoreError::MalformedBlock(format!("{} must be 32 bytes", what))),
        _ => Err(CoreError::MalformedBlock(format!("{} is not a byte string", what))),
    }
}
