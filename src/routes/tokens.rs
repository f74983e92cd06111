use axum::{Json, extract::State, http::StatusCode};

use crate::state::AppState;
use crate::tokens::{token_prices, top_tokens};
use crate::types::{TokenListing, TokenPrice, TokenPricesRequest};

pub async fn get_top_tokens(State(state): State<AppState>) -> Json<Vec<TokenListing>> {
    Json(top_tokens(state.markets.as_ref(), &state.token_symbols).await)
}

pub async fn get_token_prices(
    State(state): State<AppState>,
    Json(payload): Json<TokenPricesRequest>,
) -> Result<Json<Vec<TokenPrice>>, (StatusCode, String)> {
    let Some(tokens) = payload.tokens else {
        return Err((StatusCode::BAD_REQUEST, "Invalid tokens array".to_string()));
    };

    Ok(Json(token_prices(state.markets.as_ref(), &tokens).await))
}
