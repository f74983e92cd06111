pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod types;
pub mod routes;

pub mod eth;
pub mod models;
pub mod payout;
pub mod proof;
pub mod ranking;
pub mod settlement;
pub mod store;
pub mod tokens;
pub mod wallet;
pub mod worker;

use axum::Router;
use state::AppState;

pub fn app(state: AppState) -> Router {
    routes::router(state)
}
