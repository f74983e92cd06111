use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("no participant has obtainable performance data")]
    NoParticipants,

    #[error("battle result has no winner leaf to commit")]
    InvalidBattleResult,

    #[error("payout leaf not found in battle result")]
    LeafNotFound,

    #[error("bet pool exceeds the representable amount range")]
    PoolOverflow,

    #[error("no settlement record stored under {0}")]
    RecordNotFound(String),

    #[error("content store: {0:#}")]
    Storage(anyhow::Error),

    #[error("settlement record: {0}")]
    Record(#[from] serde_json::Error),
}

impl BattleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BattleError::NoParticipants => StatusCode::UNPROCESSABLE_ENTITY,
            BattleError::InvalidBattleResult | BattleError::PoolOverflow => StatusCode::BAD_REQUEST,
            BattleError::LeafNotFound | BattleError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            BattleError::Storage(_) => StatusCode::BAD_GATEWAY,
            BattleError::Record(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Route-level rejection, in the `(status, message)` shape the handlers return.
impl From<BattleError> for (StatusCode, String) {
    fn from(err: BattleError) -> Self {
        (err.status_code(), err.to_string())
    }
}
