use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use battlesettle_backend::config::Config;
use battlesettle_backend::eth::{ChainSubmitter, EthChainSubmitter};
use battlesettle_backend::settlement::Settler;
use battlesettle_backend::state::AppState;
use battlesettle_backend::store::{ContentStore, IpfsStore, SqliteStore};
use battlesettle_backend::wallet::ZerionClient;
use battlesettle_backend::{app, db, worker};

#[tokio::main]
async fn main() -> Result<()> {
    // Load env
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;

    let store: Arc<dyn ContentStore> = match config.ipfs.clone() {
        Some(ipfs) => Arc::new(IpfsStore::new(ipfs)?),
        None => Arc::new(SqliteStore::new(pool.clone())),
    };
    let zerion = Arc::new(ZerionClient::new(config.zerion.clone())?);

    let submit_roots = match config.chain.clone() {
        Some(chain) => {
            let submitter: Arc<dyn ChainSubmitter> = Arc::new(EthChainSubmitter::new(chain));
            let worker_db = pool.clone();
            let worker_config = config.worker.clone();

            tokio::spawn(async move {
                worker::run_worker(worker_db, submitter, worker_config).await;
            });
            true
        }
        None => {
            tracing::warn!("chain submission not configured, settled roots will not be published");
            false
        }
    };

    let state = AppState {
        db: pool,
        settler: Arc::new(Settler::new(zerion.clone(), store.clone())),
        markets: zerion,
        token_symbols: config.zerion.token_symbols.clone().into(),
        submit_roots,
    };

    tracing::info!(store = store.name(), submit_roots, "Server running on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, app(state)).await?;

    Ok(())
}
