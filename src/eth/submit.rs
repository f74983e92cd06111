// src/eth/submit.rs

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

use super::ChainSubmitter;
use super::client::eth_client;
use crate::config::ChainConfig;

pub struct EthChainSubmitter {
    config: ChainConfig,
}

impl EthChainSubmitter {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChainSubmitter for EthChainSubmitter {
    async fn submit_root(&self, root: [u8; 32]) -> Result<String> {
        let contract = eth_client(&self.config)?;

        let call = contract.set_merkle_root(root);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();

        let receipt = pending
            .await?
            .ok_or_else(|| anyhow!("transaction {tx_hash:?} dropped from mempool"))?;

        info!(
            tx = ?receipt.transaction_hash,
            block = ?receipt.block_number,
            root = %hex::encode(root),
            "merkle root confirmed on-chain"
        );

        Ok(format!("{:?}", receipt.transaction_hash))
    }
}
