//! oracle-reth node wiring
//!
//! This crate provides the node-level pieces around the price oracle:
//! - Chainspec configuration and genesis seeding
//! - EVM configuration with the oracle precompile installed
//! - Deferred fee schedule activation

/// Chainspec parser with oracle genesis seeding.
pub mod chainspec;
/// Configuration types and validation sourced from the chainspec.
pub mod config;
/// Gas price schedule and its background updater.
pub mod gas_price;
/// Startup wiring for the EVM configuration and the fee schedule.
pub mod launch;

#[cfg(test)]
mod test_utils;

// Re-export public types for convenience.
pub use chainspec::OracleChainSpecParser;
pub use config::{ConfigError, OracleNodeConfig};
pub use gas_price::{
    FeeSchedule, GasPriceSetter, GasPriceUpdater, GasSchedule, UpdaterHandle, UpdaterPath,
    UpdaterState,
};
pub use launch::{build_evm_config, launch_fee_schedule, OracleEvmConfig};
