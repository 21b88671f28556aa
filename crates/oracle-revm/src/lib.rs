//! Price oracle wiring for `revm`.

pub mod evm;
pub mod factory;

pub use evm::{OracleEvm, StaticCallPrecompiles};
pub use factory::{with_price_oracle, OracleEvmFactory, PriceOracleSettings};
