use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::state::AppState;
use crate::types::ParticipantSnapshot;

pub async fn get_wallet_snapshot(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ParticipantSnapshot>, (StatusCode, String)> {
    match state.settler.wallets().fetch_snapshot(&address).await {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Wallet snapshot not found".to_string())),
        Err(e) => {
            tracing::warn!(%address, "wallet snapshot fetch failed: {e:#}");
            Err((StatusCode::BAD_GATEWAY, format!("{e:#}")))
        }
    }
}
