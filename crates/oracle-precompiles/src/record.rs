//! Fixed-width storage encoding of a price record.
//!
//! ## Word Layout
//!
//! Every record occupies exactly one 32-byte storage word, big-endian:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | `0` | layout version ([`PRICE_RECORD_VERSION`]) |
//! | `1` | decimals (`0..=MAX_DECIMALS`) |
//! | `2..6` | symbol tag |
//! | `6..16` | reserved, zero |
//! | `16..24` | slot (`i64`) |
//! | `24..32` | price (`i64`) |
//!
//! The version byte is never zero in an encoded record, so the all-zero word
//! (the host's default for an untouched slot) is distinguishable from a stored
//! zero price.

use crate::{
    error::CodecError,
    feed::{FeedId, Symbol},
};
use alloy_primitives::{FixedBytes, B256};

/// Current layout version written into byte 0.
pub const PRICE_RECORD_VERSION: u8 = 1;

/// Largest accepted number of fractional digits.
pub const MAX_DECIMALS: u8 = 18;

const VERSION_OFFSET: usize = 0;
const DECIMALS_OFFSET: usize = 1;
const SYMBOL_RANGE: std::ops::Range<usize> = 2..6;
const RESERVED_RANGE: std::ops::Range<usize> = 6..16;
const SLOT_RANGE: std::ops::Range<usize> = 16..24;
const PRICE_RANGE: std::ops::Range<usize> = 24..32;

/// A single price observation of a feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PriceRecord {
    /// Quoted value in the feed's smallest unit.
    pub price: i64,
    /// Update round that produced the price.
    pub slot: i64,
    /// Feed symbol, used to resolve the canonical [`FeedId`].
    pub symbol: Symbol,
    /// Number of fractional digits implied by `price`.
    pub decimals: u8,
}

impl PriceRecord {
    /// Creates a record for a textual symbol.
    pub fn new(price: i64, slot: i64, symbol: &str, decimals: u8) -> Self {
        Self {
            price,
            slot,
            symbol: Symbol::new(symbol),
            decimals,
        }
    }

    /// Canonical feed of this record's symbol.
    pub fn feed_id(&self) -> Result<FeedId, crate::OracleError> {
        FeedId::for_symbol(&self.symbol)
    }

    /// Serializes the record into its storage word.
    pub fn encode(&self) -> Result<B256, CodecError> {
        if self.decimals > MAX_DECIMALS {
            return Err(CodecError::EncodingTooLarge {
                field: "decimals",
                value: self.decimals.into(),
                max: MAX_DECIMALS.into(),
            });
        }

        let mut word = B256::ZERO;
        word[VERSION_OFFSET] = PRICE_RECORD_VERSION;
        word[DECIMALS_OFFSET] = self.decimals;
        word[SYMBOL_RANGE].copy_from_slice(self.symbol.tag().as_slice());
        word[SLOT_RANGE].copy_from_slice(&self.slot.to_be_bytes());
        word[PRICE_RANGE].copy_from_slice(&self.price.to_be_bytes());
        Ok(word)
    }

    /// Parses a storage word written by [`PriceRecord::encode`].
    pub fn decode(word: B256) -> Result<Self, CodecError> {
        if word[VERSION_OFFSET] != PRICE_RECORD_VERSION {
            return Err(CodecError::MalformedRecord("unknown layout version"));
        }
        let decimals = word[DECIMALS_OFFSET];
        if decimals > MAX_DECIMALS {
            return Err(CodecError::MalformedRecord("decimals out of range"));
        }
        if word[RESERVED_RANGE].iter().any(|byte| *byte != 0) {
            return Err(CodecError::MalformedRecord("reserved bytes are not zero"));
        }

        Ok(Self {
            price: read_i64(&word[PRICE_RANGE]),
            slot: read_i64(&word[SLOT_RANGE]),
            symbol: Symbol::from_tag(FixedBytes::from_slice(&word[SYMBOL_RANGE])),
            decimals,
        })
    }
}

/// Decodes the value of a feed's storage slot.
///
/// Returns `None` for the all-zero word, i.e. a feed that was never written.
pub fn decode_slot(word: B256) -> Result<Option<PriceRecord>, CodecError> {
    if word.is_zero() {
        return Ok(None);
    }
    PriceRecord::decode(word).map(Some)
}

fn read_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    i64::from_be_bytes(buf)
}
