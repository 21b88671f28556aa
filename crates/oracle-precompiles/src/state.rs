//! Oracle storage on top of the host's per-address key-value state.

use crate::{
    error::OracleError,
    feed::FeedId,
    record::{decode_slot, PriceRecord},
};
use alloy_evm::{EvmInternals, EvmInternalsError};
use alloy_primitives::{Address, Bytes, B256};
use revm::bytecode::Bytecode;
use std::sync::OnceLock;

/// The slice of host state the oracle needs.
pub trait StateDb {
    /// Returns true if `address` exists in state.
    fn exist(&mut self, address: Address) -> Result<bool, OracleError>;

    /// Creates the account at `address`.
    fn create_account(&mut self, address: Address) -> Result<(), OracleError>;

    /// Reads the word stored under `key` in `address`'s storage.
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, OracleError>;

    /// Writes `value` under `key` in `address`'s storage.
    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), OracleError>;
}

/// Code installed on the oracle account when it is created.
///
/// `0xFE` keeps the account non-empty so state clearing never prunes it, and
/// makes any attempt to execute it as bytecode fail.
pub fn oracle_bytecode() -> &'static Bytecode {
    static BYTECODE: OnceLock<Bytecode> = OnceLock::new();
    BYTECODE.get_or_init(|| Bytecode::new_raw(Bytes::from_static(&[0xFE])))
}

fn map_internals_error(err: EvmInternalsError) -> OracleError {
    OracleError::State(err.to_string())
}

impl StateDb for EvmInternals<'_> {
    fn exist(&mut self, address: Address) -> Result<bool, OracleError> {
        let account = self.load_account(address).map_err(map_internals_error)?;
        Ok(!account.is_loaded_as_not_existing())
    }

    fn create_account(&mut self, address: Address) -> Result<(), OracleError> {
        self.load_account(address).map_err(map_internals_error)?;
        self.set_code(address, oracle_bytecode().clone());
        self.nonce_bump_journal_entry(address);
        self.touch_account(address);
        Ok(())
    }

    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, OracleError> {
        let value = self
            .sload(address, key.into())
            .map_err(map_internals_error)?;
        Ok((*value).into())
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), OracleError> {
        self.sstore(address, key.into(), value.into())
            .map_err(map_internals_error)?;
        self.touch_account(address);
        Ok(())
    }
}

/// Reads and writes price words of the oracle account at `address`.
///
/// Every call goes straight to the host store; nothing is cached here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleStateStore {
    address: Address,
}

impl OracleStateStore {
    /// Creates a store over the account at `address`.
    pub const fn new(address: Address) -> Self {
        Self { address }
    }

    /// Address whose storage holds the price words.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Creates the oracle account if it does not exist yet.
    pub fn ensure_account<S: StateDb + ?Sized>(&self, state: &mut S) -> Result<(), OracleError> {
        if !state.exist(self.address)? {
            tracing::debug!(target: "price_oracle", address = ?self.address, "creating oracle account");
            state.create_account(self.address)?;
        }
        Ok(())
    }

    /// Raw word stored for `feed`; all-zero if the feed was never written.
    pub fn get<S: StateDb + ?Sized>(&self, state: &mut S, feed: FeedId) -> Result<B256, OracleError> {
        state.get_state(self.address, feed.as_b256())
    }

    /// Stores `word` for `feed`, creating the oracle account first if needed.
    pub fn set<S: StateDb + ?Sized>(
        &self,
        state: &mut S,
        feed: FeedId,
        word: B256,
    ) -> Result<(), OracleError> {
        self.ensure_account(state)?;
        state.set_state(self.address, feed.as_b256(), word)
    }

    /// Decoded record of `feed`, `None` if the feed was never written.
    pub fn read_record<S: StateDb + ?Sized>(
        &self,
        state: &mut S,
        feed: FeedId,
    ) -> Result<Option<PriceRecord>, OracleError> {
        let word = self.get(state, feed)?;
        Ok(decode_slot(word)?)
    }

    /// Writes `record` under the canonical feed of its symbol.
    ///
    /// `setPrice` stores through here once the supplied feed id has been checked.
    pub fn write_record<S: StateDb + ?Sized>(
        &self,
        state: &mut S,
        record: &PriceRecord,
    ) -> Result<FeedId, OracleError> {
        let feed = record.feed_id()?;
        let word = record.encode()?;
        self.set(state, feed, word)?;
        tracing::info!(
            target: "price_oracle",
            %feed,
            symbol = %record.symbol,
            price = record.price,
            slot = record.slot,
            "price written"
        );
        Ok(feed)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// In-memory state that records every access.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryState {
        pub(crate) accounts: HashSet<Address>,
        pub(crate) storage: HashMap<(Address, B256), B256>,
        pub(crate) accesses: usize,
    }

    impl StateDb for MemoryState {
        fn exist(&mut self, address: Address) -> Result<bool, OracleError> {
            self.accesses += 1;
            Ok(self.accounts.contains(&address))
        }

        fn create_account(&mut self, address: Address) -> Result<(), OracleError> {
            self.accesses += 1;
            self.accounts.insert(address);
            Ok(())
        }

        fn get_state(&mut self, address: Address, key: B256) -> Result<B256, OracleError> {
            self.accesses += 1;
            Ok(self.storage.get(&(address, key)).copied().unwrap_or_default())
        }

        fn set_state(
            &mut self,
            address: Address,
            key: B256,
            value: B256,
        ) -> Result<(), OracleError> {
            self.accesses += 1;
            self.storage.insert((address, key), value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{test_utils::MemoryState, *};
    use crate::{error::CodecError, feed::Symbol, oracle::PRICE_ORACLE_ADDRESS};

    #[test]
    fn unwritten_feed_reads_as_none() {
        let store = OracleStateStore::new(PRICE_ORACLE_ADDRESS);
        let mut state = MemoryState::default();

        assert_eq!(store.get(&mut state, FeedId::from_index(1)).unwrap(), B256::ZERO);
        assert_eq!(store.read_record(&mut state, FeedId::from_index(1)).unwrap(), None);
    }

    #[test]
    fn write_record_creates_account_and_stores_under_canonical_feed() {
        let store = OracleStateStore::new(PRICE_ORACLE_ADDRESS);
        let mut state = MemoryState::default();
        let record = PriceRecord::new(6_500_000, 42, "ETH/USD", 2);

        let feed = store.write_record(&mut state, &record).unwrap();

        assert_eq!(feed, FeedId::from_index(2));
        assert!(state.accounts.contains(&PRICE_ORACLE_ADDRESS));
        assert_eq!(store.read_record(&mut state, feed).unwrap(), Some(record));
    }

    #[test]
    fn write_record_rejects_unknown_symbol() {
        let store = OracleStateStore::new(PRICE_ORACLE_ADDRESS);
        let mut state = MemoryState::default();
        let record = PriceRecord::new(1, 1, "ZZZ/ZZZ", 0);

        assert_eq!(
            store.write_record(&mut state, &record),
            Err(OracleError::UnsupportedSymbol(Symbol::new("ZZZ/ZZZ")))
        );
        assert!(state.storage.is_empty());
    }

    #[test]
    fn ensure_account_is_idempotent() {
        let store = OracleStateStore::new(PRICE_ORACLE_ADDRESS);
        let mut state = MemoryState::default();

        store.ensure_account(&mut state).unwrap();
        store.ensure_account(&mut state).unwrap();

        assert_eq!(state.accounts.len(), 1);
    }

    #[test]
    fn corrupt_word_surfaces_as_error() {
        let store = OracleStateStore::new(PRICE_ORACLE_ADDRESS);
        let mut state = MemoryState::default();
        let mut word = B256::ZERO;
        word[0] = 0x09;
        store.set(&mut state, FeedId::from_index(0), word).unwrap();

        assert_eq!(
            store.read_record(&mut state, FeedId::from_index(0)),
            Err(OracleError::Codec(CodecError::MalformedRecord(
                "unknown layout version"
            )))
        );
    }
}
