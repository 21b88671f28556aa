//! Error taxonomy for the price oracle precompile.

use crate::feed::{FeedId, Symbol};
use alloy_primitives::FixedBytes;
use revm::precompile::PrecompileError;
use thiserror::Error;

/// Errors produced while converting a price record to or from its storage word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A field value does not fit the width reserved for it in the word.
    #[error("price record field `{field}` does not fit its slot: {value} > {max}")]
    EncodingTooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: u64,
        /// Largest value the slot accepts.
        max: u64,
    },
    /// The word does not follow the price record layout.
    #[error("malformed price record: {0}")]
    MalformedRecord(&'static str),
}

/// Errors surfaced to the host as a failed precompile call.
///
/// None of these are retried; the call reverts from the host's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Call data does not match the fixed width expected for the selector.
    #[error("invalid input length: expected {expected} bytes, got {actual}")]
    InvalidInputLength {
        /// Expected length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
    /// The price record could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The record's symbol has no canonical feed.
    #[error("unsupported symbol: {0}")]
    UnsupportedSymbol(Symbol),
    /// The supplied feed id disagrees with the canonical feed of the record's symbol.
    #[error("feed {supplied} does not match canonical feed {canonical}")]
    FeedMismatch {
        /// Feed id carried in the call data.
        supplied: FeedId,
        /// Feed id the record's symbol resolves to.
        canonical: FeedId,
    },
    /// No price has ever been written for the feed.
    #[error("no price stored for feed {0}")]
    FeedNotSet(FeedId),
    /// No handler is registered for the selector.
    #[error("unknown function selector {0}")]
    UnknownSelector(FixedBytes<4>),
    /// Supplied gas does not cover the fixed cost of the operation.
    #[error("out of gas")]
    OutOfGas,
    /// A mutating call arrived in read-only mode.
    #[error("write protection")]
    WriteProtection,
    /// The host state store failed.
    #[error("state access failed: {0}")]
    State(String),
}

impl From<OracleError> for PrecompileError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::OutOfGas => Self::OutOfGas,
            other => Self::Other(other.to_string().into()),
        }
    }
}
