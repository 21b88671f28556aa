//! Feed identifiers and the canonical symbol table.
//!
//! A feed is addressed by a 32-byte [`FeedId`]. The only supported derivation is
//! symbol → position in [`SUPPORTED_SYMBOLS`] → big-endian index word, so
//! `AVAX/USD` lives under the all-zero key. Symbols are carried inside a price
//! word as a 4-byte [`Symbol`] tag (`keccak256(symbol)[..4]`), never as text.
//!
//! [`FeedId::for_symbol`] can only compare tags, so any text whose tag equals a
//! supported one resolves to that feed. Where the text is known, as for genesis
//! prices, [`FeedId::for_name`] matches it exactly instead.

use crate::error::OracleError;
use alloy_primitives::{keccak256, FixedBytes, B256, U256};
use std::{fmt, sync::OnceLock};

/// Symbols with a canonical feed, in feed-index order.
///
/// Append only: an entry's position is its feed id.
pub const SUPPORTED_SYMBOLS: [&str; 5] = ["AVAX/USD", "BTC/USD", "ETH/USD", "SOL/USD", "USDC/USD"];

/// Opaque 32-byte key of a price feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(B256);

impl FeedId {
    /// Wraps a raw 32-byte key.
    pub const fn new(raw: B256) -> Self {
        Self(raw)
    }

    /// Feed id of the `index`-th entry of the symbol table.
    pub fn from_index(index: u64) -> Self {
        Self(U256::from(index).into())
    }

    /// Resolves the canonical feed of `symbol`.
    pub fn for_symbol(symbol: &Symbol) -> Result<Self, OracleError> {
        symbol_table()
            .iter()
            .position(|entry| entry.symbol == *symbol)
            .map(|index| Self::from_index(index as u64))
            .ok_or(OracleError::UnsupportedSymbol(*symbol))
    }

    /// Resolves the canonical feed of a textual symbol, matching the text exactly.
    pub fn for_name(name: &str) -> Result<Self, OracleError> {
        SUPPORTED_SYMBOLS
            .iter()
            .position(|supported| *supported == name)
            .map(|index| Self::from_index(index as u64))
            .ok_or_else(|| OracleError::UnsupportedSymbol(Symbol::new(name)))
    }

    /// Returns the storage key of this feed.
    pub const fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for FeedId {
    fn from(raw: B256) -> Self {
        Self(raw)
    }
}

impl From<FeedId> for U256 {
    fn from(feed: FeedId) -> Self {
        feed.0.into()
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compact tag identifying a feed symbol inside a price word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Symbol(FixedBytes<4>);

impl Symbol {
    /// Derives the tag of a textual symbol such as `"AVAX/USD"`.
    pub fn new(symbol: &str) -> Self {
        let hash = keccak256(symbol.as_bytes());
        Self(FixedBytes::from_slice(&hash[..4]))
    }

    /// Wraps a raw tag read back from storage.
    pub const fn from_tag(tag: FixedBytes<4>) -> Self {
        Self(tag)
    }

    /// Returns the raw tag.
    pub const fn tag(&self) -> FixedBytes<4> {
        self.0
    }

    /// Textual name, if the tag belongs to a supported symbol.
    pub fn name(&self) -> Option<&'static str> {
        symbol_table()
            .iter()
            .find(|entry| entry.symbol == *self)
            .map(|entry| entry.name)
    }
}

impl From<&str> for Symbol {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Debug)]
struct SymbolEntry {
    name: &'static str,
    symbol: Symbol,
}

fn symbol_table() -> &'static [SymbolEntry] {
    static TABLE: OnceLock<Vec<SymbolEntry>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SUPPORTED_SYMBOLS
            .iter()
            .map(|&name| SymbolEntry {
                name,
                symbol: Symbol::new(name),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn avax_usd_maps_to_zero_key() {
        let feed = FeedId::for_symbol(&Symbol::new("AVAX/USD")).unwrap();
        assert_eq!(feed, FeedId::new(B256::ZERO));
    }

    #[test]
    fn feed_ids_follow_table_order() {
        for (index, name) in SUPPORTED_SYMBOLS.iter().enumerate() {
            let feed = FeedId::for_symbol(&Symbol::new(name)).unwrap();
            assert_eq!(feed, FeedId::from_index(index as u64), "feed of {name}");
        }
    }

    #[test]
    fn symbol_tags_are_unique() {
        let tags: HashSet<_> = SUPPORTED_SYMBOLS
            .iter()
            .map(|name| Symbol::new(name).tag())
            .collect();
        assert_eq!(tags.len(), SUPPORTED_SYMBOLS.len(), "symbol tags must not collide");
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let symbol = Symbol::new("ZZZ/ZZZ");
        assert_eq!(
            FeedId::for_symbol(&symbol),
            Err(OracleError::UnsupportedSymbol(symbol))
        );
        assert_eq!(symbol.name(), None);
    }

    #[test]
    fn names_resolve_exactly() {
        assert_eq!(FeedId::for_name("SOL/USD").unwrap(), FeedId::from_index(3));
        assert_eq!(
            FeedId::for_name("avax/usd"),
            Err(OracleError::UnsupportedSymbol(Symbol::new("avax/usd")))
        );
        assert!(FeedId::for_name("AVAX/USD ").is_err());
    }

    #[test]
    fn symbol_renders_its_name() {
        assert_eq!(Symbol::new("ETH/USD").to_string(), "ETH/USD");
        assert!(Symbol::new("ZZZ/ZZZ").to_string().starts_with("0x"));
    }
}
