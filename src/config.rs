//! Service configuration, read from the environment.
//!
//! `main` loads `.env` through `dotenvy` first; everything else goes through
//! [`Config::from_lookup`] so tests can supply a plain map.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ethers::types::Address;
use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub zerion: ZerionConfig,
    pub ipfs: Option<IpfsConfig>,
    pub chain: Option<ChainConfig>,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct ZerionConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub chain_id: String,
    /// Symbols searched for the top-token listing.
    pub token_symbols: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IpfsConfig {
    pub api_url: String,
    pub project_id: Option<String>,
    pub project_secret: Option<SecretString>,
}

/// Connection and signing material for root submission. Handed to the
/// submitter explicitly; nothing here is cached process-wide.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key: SecretString,
    pub contract_address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub max_retries: i64,
}

pub const DEFAULT_TOKEN_SYMBOLS: [&str; 10] = ["SOL", "USDC", "USDT", "BONK", "JUP", "RAY", "ORCA", "MNGO", "SAMO", "STEP"];

const CHAIN_VARS: [&str; 4] = ["RPC_URL", "PRIVATE_KEY", "CONTRACT_ADDRESS", "CHAIN_ID"];

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = get("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:4000".to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;

        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite://battlesettle.db?mode=rwc".to_string());

        let zerion = ZerionConfig {
            api_key: SecretString::new(get("ZERION_API_KEY").unwrap_or_default()),
            base_url: get("ZERION_BASE_URL")
                .unwrap_or_else(|| "https://api.zerion.io/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            chain_id: get("ZERION_CHAIN_ID").unwrap_or_else(|| "solana".to_string()),
            token_symbols: match get("ZERION_TOKEN_SYMBOLS") {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => DEFAULT_TOKEN_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            },
        };

        let ipfs = get("IPFS_API_URL").map(|api_url| IpfsConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id: get("IPFS_PROJECT_ID"),
            project_secret: get("IPFS_PROJECT_SECRET").map(SecretString::new),
        });

        let present: Vec<&str> = CHAIN_VARS.iter().copied().filter(|k| get(*k).is_some()).collect();
        let chain = match present.len() {
            0 => None,
            n if n == CHAIN_VARS.len() => Some(ChainConfig {
                rpc_url: get("RPC_URL").unwrap_or_default(),
                private_key: SecretString::new(get("PRIVATE_KEY").unwrap_or_default()),
                contract_address: get("CONTRACT_ADDRESS")
                    .unwrap_or_default()
                    .parse::<Address>()
                    .context("CONTRACT_ADDRESS is not an address")?,
                chain_id: get("CHAIN_ID")
                    .unwrap_or_default()
                    .parse::<u64>()
                    .context("CHAIN_ID is not an integer")?,
            }),
            _ => {
                let missing: Vec<&str> = CHAIN_VARS.iter().copied().filter(|k| !present.contains(k)).collect();
                bail!("chain submission is partially configured, missing {}", missing.join(", "));
            }
        };

        let worker = WorkerConfig {
            poll_interval: Duration::from_secs(
                get("SUBMIT_POLL_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("SUBMIT_POLL_SECS is not an integer")?
                    .unwrap_or(5),
            ),
            max_retries: get("SUBMIT_MAX_RETRIES")
                .map(|v| v.parse::<i64>())
                .transpose()
                .context("SUBMIT_MAX_RETRIES is not an integer")?
                .unwrap_or(5),
        };

        Ok(Self {
            bind_addr,
            database_url,
            zerion,
            ipfs,
            chain,
            worker,
        })
    }
}
