// src/eth/client.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use ethers::prelude::*;
use secrecy::ExposeSecret;

use super::BattleOracle;
use crate::config::ChainConfig;

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub fn eth_client(config: &ChainConfig) -> Result<BattleOracle<SignerClient>> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .with_context(|| format!("invalid RPC_URL {}", config.rpc_url))?;

    let wallet: LocalWallet = config
        .private_key
        .expose_secret()
        .parse()
        .context("PRIVATE_KEY is not a valid signing key")?;
    let wallet = wallet.with_chain_id(config.chain_id);

    let client = SignerMiddleware::new(provider, wallet);
    let client = Arc::new(client);

    Ok(BattleOracle::new(config.contract_address, client))
}
