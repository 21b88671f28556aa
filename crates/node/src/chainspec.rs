use crate::config::ChainspecOracleConfig;
use alloy_genesis::{Genesis, GenesisAccount};
use eyre::{Result, WrapErr};
use oracle_precompiles::{genesis::genesis_storage, state::oracle_bytecode};
use reth_chainspec::{ChainSpec, DEV, HOLESKY, HOODI, MAINNET, SEPOLIA};
use reth_cli::chainspec::{parse_genesis, ChainSpecParser};
use std::sync::Arc;
use tracing::info;

/// Chains supported by oracle-reth. First value should be used as the default.
pub const SUPPORTED_CHAINS: &[&str] = &["mainnet", "sepolia", "holesky", "hoodi", "dev"];

/// Chainspec parser that seeds the oracle account from the `oracle` extras block.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OracleChainSpecParser;

impl ChainSpecParser for OracleChainSpecParser {
    type ChainSpec = ChainSpec;

    const SUPPORTED_CHAINS: &'static [&'static str] = SUPPORTED_CHAINS;

    fn parse(s: &str) -> Result<Arc<ChainSpec>> {
        match s {
            "mainnet" => Ok(MAINNET.clone()),
            "sepolia" => Ok(SEPOLIA.clone()),
            "holesky" => Ok(HOLESKY.clone()),
            "hoodi" => Ok(HOODI.clone()),
            "dev" => Ok(DEV.clone()),
            _ => parse_custom_chain_spec(s),
        }
    }
}

fn parse_custom_chain_spec(input: &str) -> Result<Arc<ChainSpec>> {
    let mut genesis = parse_genesis(input).wrap_err("Failed to parse genesis config")?;
    apply_oracle_genesis(&mut genesis)?;

    let chain_spec: ChainSpec = genesis.into();
    Ok(Arc::new(chain_spec))
}

/// Adds the oracle account with its initial prices to the genesis alloc.
///
/// The account is allocated whenever the oracle is enabled, even without
/// initial prices. An existing alloc entry at the oracle address keeps its
/// balance and any unrelated storage; configured prices overwrite their feed
/// slots.
fn apply_oracle_genesis(genesis: &mut Genesis) -> Result<()> {
    let Some(extras) = ChainspecOracleConfig::from_genesis(genesis)
        .wrap_err("Invalid oracle extras in chainspec")?
    else {
        return Ok(());
    };
    let Some(address) = extras.oracle_address() else {
        return Ok(());
    };
    let storage = genesis_storage(&extras.initial_prices)
        .wrap_err("Invalid initialPrices in oracle extras")?;

    let account = genesis
        .alloc
        .entry(address)
        .or_insert_with(GenesisAccount::default);
    if account.code.is_none() {
        account.code = Some(oracle_bytecode().original_bytes());
    }
    if account.nonce.is_none() {
        account.nonce = Some(1);
    }
    if !storage.is_empty() {
        account.storage.get_or_insert_with(Default::default).extend(storage);
    }

    info!(
        target: "price_oracle",
        oracle = ?address,
        feeds = extras.initial_prices.len(),
        "seeded oracle prices into genesis"
    );
    Ok(())
}
