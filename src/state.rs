use std::sync::Arc;

use sqlx::SqlitePool;

use crate::settlement::Settler;
use crate::wallet::TokenMarketProvider;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub settler: Arc<Settler>,
    pub markets: Arc<dyn TokenMarketProvider>,
    /// Symbols searched for the top-token listing.
    pub token_symbols: Arc<[String]>,
    /// Whether settled roots are queued for on-chain submission.
    pub submit_roots: bool,
}
