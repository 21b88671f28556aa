//! EVM wrapper that reports the static-call mode of each precompile call.

use alloy_evm::{
    eth::{EthEvm, EthEvmContext},
    precompiles::PrecompilesMap,
    Database, Evm as AlloyEvm, EvmEnv,
};
use alloy_primitives::{Address, Bytes};
use oracle_precompiles::StaticCallFlag;
use reth_revm::revm::{
    context::{BlockEnv, Cfg, Evm, TxEnv},
    context_interface::{
        result::{EVMError, HaltReason, InvalidTransaction, ResultAndState},
        ContextTr,
    },
    handler::{instructions::EthInstructions, EthFrame, PrecompileProvider},
    inspector::{InspectEvm, InspectSystemCallEvm, Inspector},
    interpreter::{interpreter::EthInterpreter, CallInputs, InterpreterResult},
    primitives::hardfork::SpecId,
    ExecuteEvm, SystemCallEvm,
};

/// [`PrecompilesMap`] that records `is_static` of every call into a [`StaticCallFlag`].
#[derive(Debug, Clone)]
pub struct StaticCallPrecompiles {
    precompiles: PrecompilesMap,
    static_call: StaticCallFlag,
}

impl StaticCallPrecompiles {
    /// Wraps `precompiles`, reporting the call mode through `static_call`.
    pub const fn new(precompiles: PrecompilesMap, static_call: StaticCallFlag) -> Self {
        Self {
            precompiles,
            static_call,
        }
    }

    /// The wrapped precompile set.
    pub const fn precompiles(&self) -> &PrecompilesMap {
        &self.precompiles
    }

    /// Flag updated before every precompile call.
    pub const fn static_call(&self) -> &StaticCallFlag {
        &self.static_call
    }
}

impl<CTX> PrecompileProvider<CTX> for StaticCallPrecompiles
where
    CTX: ContextTr,
    PrecompilesMap: PrecompileProvider<CTX, Output = InterpreterResult>,
{
    type Output = InterpreterResult;

    fn set_spec(&mut self, spec: <CTX::Cfg as Cfg>::Spec) -> bool {
        <PrecompilesMap as PrecompileProvider<CTX>>::set_spec(&mut self.precompiles, spec)
    }

    fn run(
        &mut self,
        context: &mut CTX,
        inputs: &CallInputs,
    ) -> Result<Option<Self::Output>, String> {
        self.static_call.set(inputs.is_static);
        <PrecompilesMap as PrecompileProvider<CTX>>::run(&mut self.precompiles, context, inputs)
    }

    fn warm_addresses(&self) -> Box<impl Iterator<Item = Address>> {
        <PrecompilesMap as PrecompileProvider<CTX>>::warm_addresses(&self.precompiles)
    }

    fn contains(&self, address: &Address) -> bool {
        <PrecompilesMap as PrecompileProvider<CTX>>::contains(&self.precompiles, address)
    }
}

type InnerEvm<DB, I> = Evm<
    EthEvmContext<DB>,
    I,
    EthInstructions<EthInterpreter, EthEvmContext<DB>>,
    StaticCallPrecompiles,
    EthFrame<EthInterpreter>,
>;

/// Mainnet EVM whose precompiles see the static-call mode of their caller.
///
/// Exposes the inner [`PrecompilesMap`] as its precompile set, so it plugs into
/// reth wherever an [`EthEvm`] does.
#[derive(Debug)]
pub struct OracleEvm<DB: Database, I> {
    inner: InnerEvm<DB, I>,
    inspect: bool,
}

impl<DB: Database, I> OracleEvm<DB, I> {
    /// Rebuilds `evm` around a [`StaticCallPrecompiles`] reporting through `static_call`.
    pub fn from_eth_evm(
        evm: EthEvm<DB, I, PrecompilesMap>,
        static_call: StaticCallFlag,
        inspect: bool,
    ) -> Self {
        let Evm {
            ctx,
            inspector,
            instruction,
            precompiles,
            frame_stack,
        } = evm.into_inner();

        Self {
            inner: Evm {
                ctx,
                inspector,
                instruction,
                precompiles: StaticCallPrecompiles::new(precompiles, static_call),
                frame_stack,
            },
            inspect,
        }
    }

    /// Flag the precompile provider updates before every call.
    pub const fn static_call(&self) -> &StaticCallFlag {
        self.inner.precompiles.static_call()
    }
}

impl<DB, I> AlloyEvm for OracleEvm<DB, I>
where
    DB: Database,
    I: Inspector<EthEvmContext<DB>, EthInterpreter>,
{
    type DB = DB;
    type Tx = TxEnv;
    type Error = EVMError<DB::Error, InvalidTransaction>;
    type HaltReason = HaltReason;
    type Spec = SpecId;
    type Precompiles = PrecompilesMap;
    type Inspector = I;

    fn block(&self) -> &BlockEnv {
        &self.inner.ctx.block
    }

    fn chain_id(&self) -> u64 {
        self.inner.ctx.cfg.chain_id
    }

    fn transact_raw(
        &mut self,
        tx: Self::Tx,
    ) -> Result<ResultAndState<Self::HaltReason>, Self::Error> {
        if self.inspect {
            self.inner.inspect_tx(tx)
        } else {
            self.inner.transact(tx)
        }
        .map(|res| ResultAndState::new(res.result, res.state))
    }

    fn transact_system_call(
        &mut self,
        caller: Address,
        contract: Address,
        data: Bytes,
    ) -> Result<ResultAndState<Self::HaltReason>, Self::Error> {
        if self.inspect {
            self.inner
                .inspect_system_call_with_caller(caller, contract, data)
        } else {
            self.inner.system_call_with_caller(caller, contract, data)
        }
        .map(|res| ResultAndState::new(res.result, res.state))
    }

    fn finish(self) -> (Self::DB, EvmEnv<Self::Spec>) {
        let ctx = self.inner.ctx;
        (
            ctx.journaled_state.database,
            EvmEnv {
                block_env: ctx.block,
                cfg_env: ctx.cfg,
            },
        )
    }

    fn set_inspector_enabled(&mut self, enabled: bool) {
        self.inspect = enabled;
    }

    fn components(&self) -> (&Self::DB, &Self::Inspector, &Self::Precompiles) {
        (
            &self.inner.ctx.journaled_state.database,
            &self.inner.inspector,
            &self.inner.precompiles.precompiles,
        )
    }

    fn components_mut(&mut self) -> (&mut Self::DB, &mut Self::Inspector, &mut Self::Precompiles) {
        (
            &mut self.inner.ctx.journaled_state.database,
            &mut self.inner.inspector,
            &mut self.inner.precompiles.precompiles,
        )
    }
}
