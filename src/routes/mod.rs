use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub mod battle;
pub mod proof;
pub mod submission;
pub mod tokens;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/wallet/:address/snapshot", get(wallet::get_wallet_snapshot))
        .route("/api/battle/:battle_id/settle", post(battle::settle_battle))
        .route(
            "/api/battle/:battle_id/snapshot/:handle",
            get(battle::get_battle_snapshot),
        )
        .route("/api/merkle/proof", post(proof::get_proof))
        .route("/api/merkle/verify", post(proof::verify_proof))
        .route("/api/submissions/:id", get(submission::get_submission))
        .route("/api/tokens/top", get(tokens::get_top_tokens))
        .route("/api/tokens/prices", post(tokens::get_token_prices))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "battlesettle-backend" }))
}
