//! Helpers for wrapping Reth EVM factories with the price oracle precompile.

use crate::evm::OracleEvm;
use alloy_evm::{
    eth::{EthBlockExecutorFactory, EthEvmContext, EthEvmFactory},
    precompiles::{DynPrecompile, Precompile, PrecompilesMap},
    Database, Evm, EvmEnv, EvmFactory,
};
use alloy_primitives::Address;
use oracle_precompiles::{PriceOraclePrecompile, StaticCallFlag, PRICE_ORACLE_ADDRESS};
use reth_evm_ethereum::EthEvmConfig;
use reth_revm::{
    inspector::NoOpInspector,
    revm::{
        context::{
            result::{EVMError, HaltReason},
            BlockEnv, TxEnv,
        },
        context_interface::result::InvalidTransaction,
        primitives::hardfork::SpecId,
        Inspector,
    },
};
use std::sync::Arc;

/// Where the price oracle lives and from which block timestamp it is callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceOracleSettings {
    /// Address the precompile is installed at.
    pub address: Address,
    /// First block timestamp (Unix seconds) at which the precompile is installed.
    pub activation_timestamp: u64,
}

impl PriceOracleSettings {
    /// Creates settings for an oracle at `address` active from `activation_timestamp`.
    pub const fn new(address: Address, activation_timestamp: u64) -> Self {
        Self {
            address,
            activation_timestamp,
        }
    }

    /// Returns true if the oracle is installed for a block at `timestamp`.
    pub const fn is_active(&self, timestamp: u64) -> bool {
        timestamp >= self.activation_timestamp
    }
}

impl Default for PriceOracleSettings {
    fn default() -> Self {
        Self::new(PRICE_ORACLE_ADDRESS, 0)
    }
}

/// Wrapper around an existing `EvmFactory` that produces [`OracleEvm`] instances
/// carrying the price oracle.
#[derive(Debug, Clone)]
pub struct OracleEvmFactory<F> {
    inner: F,
    oracle: Option<PriceOracleSettings>,
}

impl<F> OracleEvmFactory<F> {
    /// Creates a new factory wrapper. `None` leaves the precompile set untouched.
    pub const fn new(inner: F, oracle: Option<PriceOracleSettings>) -> Self {
        Self { inner, oracle }
    }

    /// Settings the factory installs the oracle with, if any.
    pub const fn oracle(&self) -> Option<PriceOracleSettings> {
        self.oracle
    }

    fn install_price_oracle(
        &self,
        precompiles: &mut PrecompilesMap,
        static_call: &StaticCallFlag,
        timestamp: u64,
    ) {
        let Some(settings) = self.oracle else { return };
        if !settings.is_active(timestamp) {
            tracing::trace!(
                target: "price_oracle",
                timestamp,
                activation = settings.activation_timestamp,
                "price oracle not yet active"
            );
            return;
        }

        let oracle = Arc::new(
            PriceOraclePrecompile::new(settings.address).with_static_call_flag(static_call.clone()),
        );
        let id = PriceOraclePrecompile::id().clone();

        precompiles.apply_precompile(&settings.address, move |_| {
            let oracle_for_call = Arc::clone(&oracle);
            Some(DynPrecompile::new_stateful(id, move |input| {
                oracle_for_call.call(input)
            }))
        });
    }
}

impl EvmFactory for OracleEvmFactory<EthEvmFactory> {
    type Evm<DB: Database, I: Inspector<Self::Context<DB>>> = OracleEvm<DB, I>;
    type Context<DB: Database> = EthEvmContext<DB>;
    type Tx = TxEnv;
    type Error<DBError: std::error::Error + Send + Sync + 'static> =
        EVMError<DBError, InvalidTransaction>;
    type HaltReason = HaltReason;
    type Spec = SpecId;
    type BlockEnv = BlockEnv;
    type Precompiles = PrecompilesMap;

    fn create_evm<DB: Database>(
        &self,
        db: DB,
        evm_env: EvmEnv<Self::Spec, Self::BlockEnv>,
    ) -> Self::Evm<DB, NoOpInspector> {
        let timestamp = evm_env.block_env.timestamp.saturating_to::<u64>();
        let inner = self.inner.create_evm(db, evm_env);
        let mut evm = OracleEvm::from_eth_evm(inner, StaticCallFlag::new(), false);
        let static_call = evm.static_call().clone();
        self.install_price_oracle(evm.precompiles_mut(), &static_call, timestamp);
        evm
    }

    fn create_evm_with_inspector<DB: Database, I: Inspector<Self::Context<DB>>>(
        &self,
        db: DB,
        input: EvmEnv<Self::Spec, Self::BlockEnv>,
        inspector: I,
    ) -> Self::Evm<DB, I> {
        let timestamp = input.block_env.timestamp.saturating_to::<u64>();
        let inner = self.inner.create_evm_with_inspector(db, input, inspector);
        let mut evm = OracleEvm::from_eth_evm(inner, StaticCallFlag::new(), true);
        let static_call = evm.static_call().clone();
        self.install_price_oracle(evm.precompiles_mut(), &static_call, timestamp);
        evm
    }
}

/// Wraps an [`EthEvmConfig`] so that its EVMs carry the price oracle.
pub fn with_price_oracle<ChainSpec>(
    config: EthEvmConfig<ChainSpec, EthEvmFactory>,
    oracle: Option<PriceOracleSettings>,
) -> EthEvmConfig<ChainSpec, OracleEvmFactory<EthEvmFactory>> {
    let EthEvmConfig {
        executor_factory,
        block_assembler,
    } = config;
    let wrapped_factory = OracleEvmFactory::new(*executor_factory.evm_factory(), oracle);
    let new_executor_factory = EthBlockExecutorFactory::new(
        *executor_factory.receipt_builder(),
        executor_factory.spec().clone(),
        wrapped_factory,
    );

    EthEvmConfig {
        executor_factory: new_executor_factory,
        block_assembler,
    }
}
