// src/eth/mod.rs

use async_trait::async_trait;
use ethers::prelude::*;

pub mod client;
pub mod submit;

pub use submit::EthChainSubmitter;

abigen!(
    BattleOracle,
    r#"[
        function setMerkleRoot(bytes32 root) external
    ]"#
);

/// Publishes a settlement root on-chain. Called by the submission worker,
/// never by the settlement core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Returns the transaction id.
    async fn submit_root(&self, root: [u8; 32]) -> anyhow::Result<String>;
}
