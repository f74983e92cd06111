//! Wallet performance and token market data.
//!
//! The settlement core only sees [`WalletDataProvider`]; the token routes
//! only see [`TokenMarketProvider`]. [`ZerionClient`] implements both.

pub mod zerion;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ParticipantSnapshot, TokenListing, TokenPrice};

pub use zerion::ZerionClient;

#[async_trait]
pub trait WalletDataProvider: Send + Sync {
    /// Current performance snapshot for `address`.
    ///
    /// `Ok(None)` means the provider answered but has nothing usable for this
    /// wallet. `Err` is a transport or upstream failure.
    async fn fetch_snapshot(&self, address: &str) -> Result<Option<ParticipantSnapshot>>;
}

#[async_trait]
pub trait TokenMarketProvider: Send + Sync {
    /// Priced tokens on the tracked chain whose symbol equals `symbol`,
    /// ignoring case.
    async fn search_tokens(&self, symbol: &str) -> Result<Vec<TokenListing>>;

    /// `Ok(None)` when the provider does not know `token_id`.
    async fn token_price(&self, token_id: &str) -> Result<Option<TokenPrice>>;
}
