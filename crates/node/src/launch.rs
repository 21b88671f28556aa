use crate::{
    config::OracleNodeConfig,
    gas_price::{GasPriceSetter, GasPriceUpdater, UpdaterHandle},
};
use alloy_evm::eth::EthEvmFactory;
use oracle_revm::{with_price_oracle, OracleEvmFactory};
use reth_chainspec::ChainSpec;
use reth_evm_ethereum::EthEvmConfig;
use reth_tasks::shutdown::Shutdown;
use std::sync::Arc;
use tracing::info;

/// EVM configuration with the price oracle installed.
pub type OracleEvmConfig = EthEvmConfig<ChainSpec, OracleEvmFactory<EthEvmFactory>>;

/// Builds the EVM configuration for `chain_spec`, installing the price oracle if enabled.
pub fn build_evm_config(chain_spec: Arc<ChainSpec>) -> eyre::Result<OracleEvmConfig> {
    let config = OracleNodeConfig::from_chain_spec(chain_spec.as_ref())?;
    config.validate()?;

    let oracle = config.price_oracle_settings().inspect(|settings| {
        info!(
            target: "price_oracle",
            address = ?settings.address,
            activation_timestamp = settings.activation_timestamp,
            "Price oracle precompile enabled"
        );
    });

    Ok(with_price_oracle(EthEvmConfig::new(chain_spec), oracle))
}

/// Starts the fee schedule updater for `chain_spec`, feeding `setter`.
///
/// Must run inside a tokio runtime; the schedule is applied before returning
/// if its activation time has already passed.
pub fn launch_fee_schedule<S: GasPriceSetter>(
    chain_spec: &ChainSpec,
    setter: S,
    shutdown: Shutdown,
) -> eyre::Result<UpdaterHandle> {
    let config = OracleNodeConfig::from_chain_spec(chain_spec)?;
    Ok(GasPriceUpdater::new(setter, config.fee_schedule, shutdown).start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas_price::{GasSchedule, UpdaterPath, UpdaterState, DEFAULT_MIN_BASE_FEE};
    use alloy_genesis::Genesis;
    use oracle_precompiles::PRICE_ORACLE_ADDRESS;
    use oracle_revm::PriceOracleSettings;
    use reth_chainspec::ChainSpecBuilder;
    use reth_tasks::shutdown::signal;
    use serde_json::json;

    fn chainspec_with_oracle(extras: serde_json::Value) -> Arc<ChainSpec> {
        let mut genesis = Genesis::default();
        genesis
            .config
            .extra_fields
            .insert("oracle".to_string(), extras);
        Arc::new(ChainSpecBuilder::mainnet().genesis(genesis).build())
    }

    #[test]
    fn evm_config_carries_oracle_settings() {
        let chain_spec = chainspec_with_oracle(json!({ "priceOracleTimestamp": 50 }));

        let evm_config = build_evm_config(chain_spec).unwrap();

        assert_eq!(
            evm_config.executor_factory.evm_factory().oracle(),
            Some(PriceOracleSettings::new(PRICE_ORACLE_ADDRESS, 50))
        );
    }

    #[test]
    fn evm_config_without_extras_has_no_oracle() {
        let chain_spec = Arc::new(ChainSpecBuilder::mainnet().build());

        let evm_config = build_evm_config(chain_spec).unwrap();

        assert_eq!(evm_config.executor_factory.evm_factory().oracle(), None);
    }

    #[test]
    fn invalid_initial_prices_fail_evm_config() {
        let chain_spec = chainspec_with_oracle(json!({
            "initialPrices": [{ "symbol": "ZZZ/ZZZ", "price": 1, "decimals": 0 }]
        }));

        assert!(build_evm_config(chain_spec).is_err());
    }

    #[tokio::test]
    async fn fee_schedule_from_chainspec_applies_immediately() {
        let chain_spec = chainspec_with_oracle(json!({ "gasPrice": 3 }));
        let schedule = Arc::new(GasSchedule::new(100, 0));
        let (_signal, shutdown) = signal();

        let handle = launch_fee_schedule(&chain_spec, Arc::clone(&schedule), shutdown).unwrap();

        assert_eq!(handle.path(), UpdaterPath::Immediate);
        assert_eq!(handle.wait().await, UpdaterState::Applied);
        assert_eq!(schedule.snapshot(), (3, DEFAULT_MIN_BASE_FEE));
    }
}
