//! Token picker data: the top tokens for a fixed symbol list, and current
//! prices for a caller-chosen set of token ids.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::types::{TokenListing, TokenPrice};
use crate::wallet::TokenMarketProvider;

const MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Searches every symbol and returns one listing per symbol, the one with the
/// largest market cap, biggest first. A failed search is skipped.
pub async fn top_tokens(markets: &dyn TokenMarketProvider, symbols: &[String]) -> Vec<TokenListing> {
    let found: Vec<Vec<TokenListing>> = stream::iter(symbols.iter().cloned())
        .map(|symbol: String| async move {
            match markets.search_tokens(&symbol).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!(%symbol, "token search failed, skipping: {e:#}");
                    Vec::new()
                }
            }
        })
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;

    largest_per_symbol(found.into_iter().flatten())
}

/// Ties keep the listing seen first. Listings without a market cap sort last.
fn largest_per_symbol(listings: impl IntoIterator<Item = TokenListing>) -> Vec<TokenListing> {
    let mut best: HashMap<String, TokenListing> = HashMap::new();

    for listing in listings {
        let key = listing.symbol.to_uppercase();
        match best.get(&key) {
            Some(current) if current.market_cap >= listing.market_cap => {}
            _ => {
                best.insert(key, listing);
            }
        }
    }

    let mut out: Vec<TokenListing> = best.into_values().collect();
    out.sort_by(|a, b| {
        b.market_cap
            .cmp(&a.market_cap)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    out
}

/// One entry per requested id, in request order. Tokens that cannot be
/// priced come back with empty fields.
pub async fn token_prices(markets: &dyn TokenMarketProvider, token_ids: &[String]) -> Vec<TokenPrice> {
    stream::iter(token_ids.iter().cloned())
        .map(|id: String| async move {
            match markets.token_price(&id).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    debug!(token = %id, "token unknown to provider");
                    TokenPrice::unpriced(&id)
                }
                Err(e) => {
                    warn!(token = %id, "token price lookup failed: {e:#}");
                    TokenPrice::unpriced(&id)
                }
            }
        })
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await
}
