use crate::gas_price::{FeeSchedule, DEFAULT_MIN_BASE_FEE};
use alloy_genesis::Genesis;
use alloy_primitives::Address;
use oracle_precompiles::{genesis::genesis_storage, InitialPrice, OracleError, PRICE_ORACLE_ADDRESS};
use oracle_revm::PriceOracleSettings;
use reth_chainspec::ChainSpec;
use serde::{Deserialize, Serialize};

/// Key of the oracle extras block in the chainspec genesis config.
pub const ORACLE_EXTRAS_KEY: &str = "oracle";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChainspecOracleConfig {
    #[serde(default)]
    pub(crate) price_oracle_address: Option<Address>,
    #[serde(default)]
    pub(crate) price_oracle_timestamp: Option<u64>,
    #[serde(default)]
    pub(crate) fee_schedule_timestamp: Option<u64>,
    #[serde(default)]
    pub(crate) gas_price: Option<u128>,
    #[serde(default)]
    pub(crate) min_base_fee: Option<u128>,
    #[serde(default)]
    pub(crate) initial_prices: Vec<InitialPrice>,
}

impl ChainspecOracleConfig {
    /// Reads the oracle extras of `genesis`, `None` if the block is absent.
    pub(crate) fn from_genesis(genesis: &Genesis) -> Result<Option<Self>, ConfigError> {
        genesis
            .config
            .extra_fields
            .get_deserialized::<Self>(ORACLE_EXTRAS_KEY)
            .transpose()
            .map_err(ConfigError::InvalidExtras)
    }

    /// Oracle address, `None` when explicitly set to the zero address.
    pub(crate) fn oracle_address(&self) -> Option<Address> {
        match self.price_oracle_address {
            Some(addr) if addr.is_zero() => None,
            Some(addr) => Some(addr),
            None => Some(PRICE_ORACLE_ADDRESS),
        }
    }
}

/// Oracle node configuration sourced from the chainspec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OracleNodeConfig {
    /// Address of the price oracle precompile, if enabled.
    pub price_oracle_address: Option<Address>,
    /// Block timestamp from which the precompile is installed; defaults to 0 when enabled.
    pub price_oracle_timestamp: Option<u64>,
    /// Fee schedule applied by the gas price updater.
    pub fee_schedule: FeeSchedule,
    /// Prices seeded into oracle storage at genesis.
    pub initial_prices: Vec<InitialPrice>,
}

impl OracleNodeConfig {
    /// Builds the configuration from the provided chain spec extras.
    ///
    /// Without an `oracle` extras block the precompile stays disabled and the
    /// default fee schedule applies from genesis.
    pub fn from_chain_spec(spec: &ChainSpec) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(extras) = ChainspecOracleConfig::from_genesis(&spec.genesis)? {
            config.price_oracle_address = extras.oracle_address();
            if config.price_oracle_address.is_some() {
                config.price_oracle_timestamp = Some(extras.price_oracle_timestamp.unwrap_or(0));
            }

            config.fee_schedule = FeeSchedule {
                activation_timestamp: extras.fee_schedule_timestamp.unwrap_or(0),
                gas_price: extras.gas_price.unwrap_or(0),
                min_base_fee: extras.min_base_fee.unwrap_or(DEFAULT_MIN_BASE_FEE),
            };
            config.initial_prices = extras.initial_prices;
        }
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_oracle_address.is_none() && !self.initial_prices.is_empty() {
            return Err(ConfigError::InitialPricesWithoutOracle);
        }
        genesis_storage(&self.initial_prices).map_err(ConfigError::InvalidInitialPrice)?;
        Ok(())
    }

    /// Returns the precompile settings if the oracle is enabled.
    pub fn price_oracle_settings(&self) -> Option<PriceOracleSettings> {
        self.price_oracle_address.map(|address| {
            let activation = self.price_oracle_timestamp.unwrap_or(0);
            PriceOracleSettings::new(address, activation)
        })
    }
}

/// Errors that can occur during configuration validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Chainspec extras contained invalid values
    #[error("Invalid oracle extras in chainspec: {0}")]
    InvalidExtras(#[from] serde_json::Error),
    /// An initial price cannot be stored
    #[error("Invalid initial price: {0}")]
    InvalidInitialPrice(OracleError),
    /// Initial prices were configured while the oracle is disabled
    #[error("initialPrices requires the price oracle to be enabled")]
    InitialPricesWithoutOracle,
}
