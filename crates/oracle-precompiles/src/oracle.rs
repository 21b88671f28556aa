//! Price Oracle Precompile
//!
//! Stores price records under feed identifiers and serves them back to
//! contracts through a fixed-address native contract.
//!
//! ## Interface
//!
//! ```solidity
//! interface IPriceOracle {
//!     function getPrice(uint256 feedId) external view returns (int256);
//!     function getDecimals(uint256 feedId) external view returns (uint256);
//!     function getSlot(uint256 feedId) external view returns (int256);
//!     function setPrice(uint256 feedId, uint256 price) external;
//! }
//! ```
//!
//! ## Gas
//!
//! Each function charges a fixed cost up front, independent of input size:
//! [`GET_PRICE_GAS_COST`] for the getters and [`SET_PRICE_GAS_COST`] for
//! `setPrice`. A call that cannot cover the cost fails before touching state.
//!
//! ## Read-only calls
//!
//! Only `setPrice` honors the read-only flag. It charges gas, then fails with
//! [`OracleError::WriteProtection`] without mutating state. Getters are served
//! in read-only mode. Inside the EVM the flag comes from a [`StaticCallFlag`]
//! the host updates before every precompile call.
//!
//! ## Failures
//!
//! Through the [`Precompile`] adapter a failed call reverts and is charged only
//! the gas deducted before the failure. Running out of gas and host state errors
//! are reported as [`PrecompileError`] instead.
//!
//! ## Storage Layout
//!
//! | Slot | Description |
//! |------|-------------|
//! | `FeedId` | encoded [`PriceRecord`](crate::record::PriceRecord) word |

use crate::{
    abi::{
        split_selector, unpack_get, unpack_set, Selector, GET_DECIMALS_SELECTOR,
        GET_PRICE_SELECTOR, GET_SLOT_SELECTOR, SET_PRICE_SELECTOR,
    },
    error::OracleError,
    feed::FeedId,
    state::{OracleStateStore, StateDb},
};
use alloy_evm::{
    precompiles::{Precompile, PrecompileInput},
    revm::precompile::{PrecompileId, PrecompileResult},
};
use alloy_primitives::{address, Address, Bytes, FixedBytes, B256, U256};
use revm::precompile::{PrecompileError, PrecompileOutput};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};
use thiserror::Error;

/// Price Oracle Precompile Address: `0x0300..01`.
pub const PRICE_ORACLE_ADDRESS: Address = address!("0x0300000000000000000000000000000000000001");

/// Fixed gas cost of `getPrice`, `getDecimals` and `getSlot`.
pub const GET_PRICE_GAS_COST: u64 = 5_000;

/// Fixed gas cost of `setPrice`.
pub const SET_PRICE_GAS_COST: u64 = 20_000;

/// Scalar returned by a getter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PriceField {
    Price,
    Decimals,
    Slot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OracleFunction {
    Read(PriceField),
    SetPrice,
}

/// Registered functions, matched by exact selector. There is no fallback.
const FUNCTIONS: [(Selector, OracleFunction); 4] = [
    (GET_PRICE_SELECTOR, OracleFunction::Read(PriceField::Price)),
    (GET_DECIMALS_SELECTOR, OracleFunction::Read(PriceField::Decimals)),
    (GET_SLOT_SELECTOR, OracleFunction::Read(PriceField::Slot)),
    (SET_PRICE_SELECTOR, OracleFunction::SetPrice),
];

/// Per-invocation context handed over by the host.
#[derive(Clone, Copy, Debug)]
pub struct CallFrame<'a> {
    /// Account that issued the call.
    pub caller: Address,
    /// Account whose storage the call operates on.
    pub address: Address,
    /// Raw call data, selector included.
    pub input: &'a [u8],
    /// Gas supplied to the call.
    pub gas: u64,
    /// Whether state mutation is forbidden.
    pub read_only: bool,
}

/// Successful call result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutput {
    /// Return data.
    pub output: Bytes,
    /// Gas left after the fixed cost was charged.
    pub remaining_gas: u64,
}

/// Failed call result. Gas charged before the failure stays charged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct CallFailure {
    /// Why the call failed.
    pub error: OracleError,
    /// Gas left to return to the caller.
    pub remaining_gas: u64,
}

/// Outcome of [`PriceOraclePrecompile::run`].
pub type CallResult = Result<CallOutput, CallFailure>;

/// Charges `cost` from `supplied`.
pub const fn deduct_gas(supplied: u64, cost: u64) -> Result<u64, OracleError> {
    match supplied.checked_sub(cost) {
        Some(remaining) => Ok(remaining),
        None => Err(OracleError::OutOfGas),
    }
}

/// Sign-extends `value` into a 32-byte two's complement word.
fn int_word(value: i64) -> B256 {
    let mut word = if value < 0 {
        B256::repeat_byte(0xff)
    } else {
        B256::ZERO
    };
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Static-call mode of the precompile call the host is about to run.
///
/// Clones share the same flag. The host sets it before each precompile call and
/// [`PriceOraclePrecompile`] reads it as the call's read-only flag.
#[derive(Clone, Debug, Default)]
pub struct StaticCallFlag(Arc<AtomicBool>);

impl StaticCallFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether the next call runs in a static context.
    pub fn set(&self, is_static: bool) {
        self.0.store(is_static, Ordering::Relaxed);
    }

    /// Returns true if the current call runs in a static context.
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The price oracle precompile.
#[derive(Clone, Debug)]
pub struct PriceOraclePrecompile {
    address: Address,
    static_call: StaticCallFlag,
}

impl PriceOraclePrecompile {
    /// Lazily-initialized precompile ID
    pub fn id() -> &'static PrecompileId {
        static ID: OnceLock<PrecompileId> = OnceLock::new();
        ID.get_or_init(|| PrecompileId::custom("price_oracle"))
    }

    /// Creates the precompile installed at `address`.
    ///
    /// Without [`Self::with_static_call_flag`] every call is treated as mutable.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            static_call: StaticCallFlag::default(),
        }
    }

    /// Reads the read-only flag of each call from `flag`.
    pub fn with_static_call_flag(mut self, flag: StaticCallFlag) -> Self {
        self.static_call = flag;
        self
    }

    /// Address the precompile is installed at.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Routes one call to its handler.
    pub fn run<S: StateDb + ?Sized>(&self, state: &mut S, frame: CallFrame<'_>) -> CallResult {
        let (selector, args) = split_selector(frame.input).map_err(|error| CallFailure {
            error,
            remaining_gas: frame.gas,
        })?;

        let Some(function) = FUNCTIONS
            .iter()
            .find(|(registered, _)| *registered == selector)
            .map(|(_, function)| *function)
        else {
            tracing::debug!(
                target: "price_oracle",
                selector = %FixedBytes::from(selector),
                "no handler for selector"
            );
            return Err(CallFailure {
                error: OracleError::UnknownSelector(selector.into()),
                remaining_gas: frame.gas,
            });
        };

        tracing::debug!(
            target: "price_oracle",
            caller = ?frame.caller,
            ?function,
            gas = frame.gas,
            read_only = frame.read_only,
            "dispatching oracle call"
        );

        match function {
            OracleFunction::Read(field) => charge(frame.gas, GET_PRICE_GAS_COST, || {
                self.read_field(state, &frame, args, field)
            }),
            OracleFunction::SetPrice => charge(frame.gas, SET_PRICE_GAS_COST, || {
                self.set_price(state, &frame, args)
            }),
        }
    }

    /// Serves one scalar of a feed's record.
    ///
    /// The oracle account is created on read as well as on write.
    fn read_field<S: StateDb + ?Sized>(
        &self,
        state: &mut S,
        frame: &CallFrame<'_>,
        args: &[u8],
        field: PriceField,
    ) -> Result<Bytes, OracleError> {
        let feed = unpack_get(args)?;
        let store = OracleStateStore::new(frame.address);
        store.ensure_account(state)?;

        let record = store
            .read_record(state, feed)?
            .ok_or(OracleError::FeedNotSet(feed))?;

        let word = match field {
            PriceField::Price => int_word(record.price),
            PriceField::Slot => int_word(record.slot),
            PriceField::Decimals => U256::from(record.decimals).into(),
        };
        Ok(Bytes::copy_from_slice(word.as_slice()))
    }

    fn set_price<S: StateDb + ?Sized>(
        &self,
        state: &mut S,
        frame: &CallFrame<'_>,
        args: &[u8],
    ) -> Result<Bytes, OracleError> {
        if frame.read_only {
            tracing::warn!(target: "price_oracle", caller = ?frame.caller, "setPrice in read-only call");
            return Err(OracleError::WriteProtection);
        }

        let (feed, record) = unpack_set(args)?;
        let canonical = FeedId::for_symbol(&record.symbol).inspect_err(|_| {
            tracing::warn!(
                target: "price_oracle",
                caller = ?frame.caller,
                symbol = %record.symbol,
                "unsupported symbol"
            );
        })?;
        if canonical != feed {
            return Err(OracleError::FeedMismatch {
                supplied: feed,
                canonical,
            });
        }

        OracleStateStore::new(frame.address).write_record(state, &record)?;
        tracing::debug!(target: "price_oracle", caller = ?frame.caller, %feed, "setPrice applied");
        Ok(Bytes::new())
    }
}

/// Charges `cost` and runs `handler`, attaching the remaining gas to either outcome.
fn charge<F>(supplied: u64, cost: u64, handler: F) -> CallResult
where
    F: FnOnce() -> Result<Bytes, OracleError>,
{
    let remaining_gas = deduct_gas(supplied, cost).map_err(|error| CallFailure {
        error,
        remaining_gas: 0,
    })?;

    match handler() {
        Ok(output) => Ok(CallOutput {
            output,
            remaining_gas,
        }),
        Err(error) => Err(CallFailure {
            error,
            remaining_gas,
        }),
    }
}

impl Precompile for PriceOraclePrecompile {
    fn precompile_id(&self) -> &PrecompileId {
        Self::id()
    }

    fn call(&self, mut input: PrecompileInput<'_>) -> PrecompileResult {
        let gas_limit = input.gas;
        let frame = CallFrame {
            caller: input.caller,
            address: input.target_address,
            input: input.data,
            gas: gas_limit,
            read_only: self.static_call.get(),
        };
        let internals = input.internals_mut();

        match self.run(internals, frame) {
            Ok(out) => Ok(PrecompileOutput::new(
                gas_limit - out.remaining_gas,
                out.output,
            )),
            Err(CallFailure {
                error: error @ (OracleError::OutOfGas | OracleError::State(_)),
                ..
            }) => Err(PrecompileError::from(error)),
            Err(failure) => Ok(PrecompileOutput::new_reverted(
                gas_limit - failure.remaining_gas,
                Bytes::from(failure.error.to_string()),
            )),
        }
    }

    fn is_pure(&self) -> bool {
        false
    }
}
