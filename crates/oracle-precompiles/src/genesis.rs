//! Genesis seeding of the oracle account.

use crate::{error::OracleError, feed::FeedId, record::PriceRecord};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A price written into oracle storage before the first block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPrice {
    /// Feed symbol, e.g. `"AVAX/USD"`.
    pub symbol: String,
    /// Quoted value in the feed's smallest unit.
    pub price: i64,
    /// Update round of the price.
    #[serde(default)]
    pub slot: i64,
    /// Number of fractional digits of `price`.
    pub decimals: u8,
}

impl InitialPrice {
    /// Converts the entry into a price record.
    pub fn to_record(&self) -> PriceRecord {
        PriceRecord::new(self.price, self.slot, &self.symbol, self.decimals)
    }
}

/// Storage of the oracle account holding `prices`, for a genesis alloc entry.
///
/// Symbols must match a supported name exactly. A later entry for the same
/// symbol wins.
pub fn genesis_storage(prices: &[InitialPrice]) -> Result<BTreeMap<B256, B256>, OracleError> {
    prices
        .iter()
        .map(|entry| -> Result<_, OracleError> {
            let feed = FeedId::for_name(&entry.symbol)?;
            Ok((feed.as_b256(), entry.to_record().encode()?))
        })
        .collect()
}
