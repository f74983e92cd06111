use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::state::AppState;
use crate::types::{SettleRequest, SettleResponse, SettlementRecord};
use crate::worker::enqueue_submission;

pub async fn settle_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    Json(payload): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, (StatusCode, String)> {
    if payload.players.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Invalid players array".to_string()));
    }

    if payload.prize_pool == 0 {
        return Err((StatusCode::BAD_REQUEST, "Invalid battle prize pool".to_string()));
    }

    if let Some(bet) = payload.bets.iter().find(|b| b.amount == 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Bet from {} has no amount", bet.bettor),
        ));
    }

    let receipt = state
        .settler
        .settle(&battle_id, &payload.players, &payload.bets, payload.prize_pool)
        .await?;

    // the record is already stored; a failed enqueue must not lose its handle
    let submission_id = if state.submit_roots {
        match enqueue_submission(&state.db, &battle_id, &receipt.merkle_root).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    %battle_id,
                    root = %receipt.merkle_root,
                    handle = %receipt.content_handle,
                    "failed to queue root submission: {e:#}"
                );
                None
            }
        }
    } else {
        None
    };

    Ok(Json(SettleResponse {
        merkle_root: receipt.merkle_root,
        content_handle: receipt.content_handle,
        submission_id,
    }))
}

pub async fn get_battle_snapshot(
    State(state): State<AppState>,
    Path((battle_id, handle)): Path<(String, String)>,
) -> Result<Json<SettlementRecord>, (StatusCode, String)> {
    let record = state.settler.load_record(&handle).await?;

    if record.battle_id != battle_id {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Snapshot {handle} does not belong to battle {battle_id}"),
        ));
    }

    Ok(Json(record))
}
