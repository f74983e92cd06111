use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub symbol: String,
    pub name: String,
    pub address: String,
    pub balance: Decimal,
    pub value_usd: Decimal,
    pub price_change_24h: Option<Decimal>,
}

/// Performance of one tracked wallet at settlement time.
///
/// `rank` stays 0 until the snapshot has gone through ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub participant: String,
    pub performance_pct: Decimal,
    pub rank: u32,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub total_value: Decimal,
    #[serde(default)]
    pub tokens: Vec<TokenHolding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub bettor: String,
    pub predicted_winner: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    #[serde(alias = "bettor")]
    pub recipient: String,
    pub amount: u64,
}

/// The object a payout commitment is built over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub battle_id: String,
    pub winner: String,
    pub winner_amount: u64,
    #[serde(default)]
    pub betting_payouts: Vec<Payout>,
}

/// Everything persisted to the content store for one settled battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub battle_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub players: Vec<String>,
    pub snapshots: Vec<ParticipantSnapshot>,
    pub winner: String,
    pub winner_amount: u64,
    pub betting_payouts: Vec<Payout>,
    pub unallocated: u64,
    pub merkle_root: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub merkle_root: String,
    pub content_handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default, alias = "battlePrizePool")]
    pub prize_pool: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub merkle_root: String,
    pub content_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub battle_result: BattleResult,
    pub player: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub proof: Vec<String>,
    pub leaf_hash: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub root: String,
    pub leaf_hash: String,
    pub proof: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: Uuid,
    pub battle_id: String,
    pub merkle_root: String,
    pub status: String,
    pub retries: i64,
    pub last_error: Option<String>,
    pub tx_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fungible token offered for battles, as found by a symbol search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub icon: Option<String>,
}

/// Current price of one requested token. Fields the provider could not
/// supply stay `None`; nothing is defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub id: String,
    pub symbol: Option<String>,
    pub price: Option<Decimal>,
    pub change_24h: Option<Decimal>,
}

impl TokenPrice {
    pub fn unpriced(id: &str) -> Self {
        Self {
            id: id.to_string(),
            symbol: None,
            price: None,
            change_24h: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenPricesRequest {
    pub tokens: Option<Vec<String>>,
}
