//! # Price Oracle Precompile
//!
//! A stateful precompile that stores price records under feed identifiers and
//! serves them back to contracts.
//!
//! ## Available Precompiles
//!
//! | Address | Name | Description |
//! |---------|------|-------------|
//! | `0x0300..01` | [`oracle`] | Price feed storage (`getPrice`, `getDecimals`, `getSlot`, `setPrice`) |
//!
//! ## Layers
//!
//! 1. **Codec**: one price record per 32-byte storage word ([`record`])
//! 2. **Calling convention**: selector-prefixed fixed-width words ([`abi`])
//! 3. **Storage**: per-feed words on the oracle account ([`state`])
//! 4. **Dispatch**: gas metering, read-only enforcement and routing ([`oracle`])
//!
//! ## Integration
//!
//! The precompile is registered via `oracle_revm::factory::OracleEvmFactory`,
//! which wraps the standard `EthEvmFactory` and installs it once the
//! configured activation timestamp is reached. Its EVM reports the static-call
//! mode of each precompile call through a shared [`StaticCallFlag`].
//!
//! ```ignore
//! use oracle_precompiles::{PriceOraclePrecompile, PRICE_ORACLE_ADDRESS};
//!
//! let oracle = PriceOraclePrecompile::new(PRICE_ORACLE_ADDRESS);
//! ```

pub mod abi;
pub mod error;
pub mod feed;
pub mod genesis;
pub mod oracle;
pub mod record;
pub mod state;

pub use error::{CodecError, OracleError};
pub use feed::{FeedId, Symbol, SUPPORTED_SYMBOLS};
pub use genesis::InitialPrice;
pub use oracle::{PriceOraclePrecompile, StaticCallFlag, PRICE_ORACLE_ADDRESS};
pub use record::PriceRecord;
pub use state::{OracleStateStore, StateDb};
