//! Call data layout of the price oracle.
//!
//! Input is `selector (4 bytes) || word_1 (32 bytes) || word_2 (32 bytes)?`
//! with no length prefixes or padding. Selectors are the first four bytes of
//! `keccak256` of the canonical signature, as generated by [`sol!`].

use crate::{
    error::OracleError,
    feed::FeedId,
    record::PriceRecord,
};
use alloy::{sol, sol_types::SolCall};
use alloy_primitives::{Bytes, B256, U256};

sol! {
    /// Price oracle interface.
    interface IPriceOracle {
        /// Latest price of a feed, in the feed's smallest unit.
        function getPrice(uint256 feedId) external view returns (int256);

        /// Number of fractional digits of a feed's price.
        function getDecimals(uint256 feedId) external view returns (uint256);

        /// Update round of a feed's latest price.
        function getSlot(uint256 feedId) external view returns (int256);

        /// Store an encoded price record under a feed.
        function setPrice(uint256 feedId, uint256 price) external;
    }
}

/// Four-byte function selector.
pub type Selector = [u8; 4];

/// Length of the selector prefix.
pub const SELECTOR_LEN: usize = 4;

/// Length of one argument word.
pub const WORD_LEN: usize = 32;

/// Argument length of the getter functions.
pub const GET_PRICE_INPUT_LEN: usize = WORD_LEN;

/// Argument length of `setPrice`.
pub const SET_PRICE_INPUT_LEN: usize = 2 * WORD_LEN;

/// Selector of `getPrice(uint256)`.
pub const GET_PRICE_SELECTOR: Selector = IPriceOracle::getPriceCall::SELECTOR;

/// Selector of `getDecimals(uint256)`.
pub const GET_DECIMALS_SELECTOR: Selector = IPriceOracle::getDecimalsCall::SELECTOR;

/// Selector of `getSlot(uint256)`.
pub const GET_SLOT_SELECTOR: Selector = IPriceOracle::getSlotCall::SELECTOR;

/// Selector of `setPrice(uint256,uint256)`.
pub const SET_PRICE_SELECTOR: Selector = IPriceOracle::setPriceCall::SELECTOR;

/// Splits call data into its selector and argument words.
pub fn split_selector(input: &[u8]) -> Result<(Selector, &[u8]), OracleError> {
    if input.len() < SELECTOR_LEN {
        return Err(OracleError::InvalidInputLength {
            expected: SELECTOR_LEN,
            actual: input.len(),
        });
    }
    let (selector, args) = input.split_at(SELECTOR_LEN);
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(selector);
    Ok((out, args))
}

/// Packs a `getPrice` call for `feed`.
pub fn pack_get_price(feed: FeedId) -> Bytes {
    IPriceOracle::getPriceCall {
        feedId: feed.into(),
    }
    .abi_encode()
    .into()
}

/// Packs a `getDecimals` call for `feed`.
pub fn pack_get_decimals(feed: FeedId) -> Bytes {
    IPriceOracle::getDecimalsCall {
        feedId: feed.into(),
    }
    .abi_encode()
    .into()
}

/// Packs a `getSlot` call for `feed`.
pub fn pack_get_slot(feed: FeedId) -> Bytes {
    IPriceOracle::getSlotCall {
        feedId: feed.into(),
    }
    .abi_encode()
    .into()
}

/// Unpacks the argument words of a getter (selector already stripped).
pub fn unpack_get(args: &[u8]) -> Result<FeedId, OracleError> {
    if args.len() != GET_PRICE_INPUT_LEN {
        return Err(OracleError::InvalidInputLength {
            expected: GET_PRICE_INPUT_LEN,
            actual: args.len(),
        });
    }
    Ok(FeedId::new(B256::from_slice(args)))
}

/// Packs a `setPrice` call storing `record` under `feed`.
pub fn pack_set_price(feed: FeedId, record: &PriceRecord) -> Result<Bytes, OracleError> {
    let word = record.encode()?;
    Ok(IPriceOracle::setPriceCall {
        feedId: feed.into(),
        price: U256::from_be_bytes(word.0),
    }
    .abi_encode()
    .into())
}

/// Unpacks the argument words of `setPrice` (selector already stripped).
pub fn unpack_set(args: &[u8]) -> Result<(FeedId, PriceRecord), OracleError> {
    if args.len() != SET_PRICE_INPUT_LEN {
        return Err(OracleError::InvalidInputLength {
            expected: SET_PRICE_INPUT_LEN,
            actual: args.len(),
        });
    }
    let (feed, price) = args.split_at(WORD_LEN);
    let record = PriceRecord::decode(B256::from_slice(price))?;
    Ok((FeedId::new(B256::from_slice(feed)), record))
}
