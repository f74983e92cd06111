use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::state::AppState;
use crate::types::SubmissionView;
use crate::worker;

pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionView>, (StatusCode, String)> {
    worker::get_submission(&state.db, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Submission not found".to_string()))
}
