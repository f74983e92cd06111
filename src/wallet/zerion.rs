//! Zerion portfolio API client.
//!
//! Two calls per wallet, issued together: simple positions filtered to the
//! configured chain, and the portfolio summary carrying the 24h change.
//! Responses are decoded into typed structs and checked; a wallet without
//! token positions or without a reported 24h change is absent, never zero.
//!
//! The same client backs the token routes through the fungibles endpoints.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{TokenMarketProvider, WalletDataProvider};
use crate::config::ZerionConfig;
use crate::types::{ParticipantSnapshot, TokenHolding, TokenListing, TokenPrice};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    data: Vec<Position>,
}

#[derive(Debug, Deserialize)]
struct Position {
    attributes: PositionAttributes,
    #[serde(default)]
    relationships: Option<PositionRelationships>,
}

#[derive(Debug, Deserialize)]
struct PositionAttributes {
    #[serde(default)]
    value: Option<Decimal>,
    #[serde(default)]
    quantity: Option<Quantity>,
    #[serde(default)]
    changes: Option<Changes>,
    #[serde(default)]
    fungible_info: Option<FungibleInfo>,
}

#[derive(Debug, Deserialize)]
struct Quantity {
    numeric: Decimal,
}

#[derive(Debug, Deserialize)]
struct Changes {
    #[serde(default)]
    percent_1d: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct FungibleInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionRelationships {
    fungible: Option<RelationshipLink>,
}

#[derive(Debug, Deserialize)]
struct RelationshipLink {
    data: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PortfolioResponse {
    data: PortfolioData,
}

#[derive(Debug, Deserialize)]
struct PortfolioData {
    attributes: PortfolioAttributes,
}

#[derive(Debug, Deserialize)]
struct PortfolioAttributes {
    #[serde(default)]
    changes: Option<Changes>,
}

#[derive(Debug, Deserialize)]
struct FungiblesResponse {
    data: Vec<Fungible>,
}

#[derive(Debug, Deserialize)]
struct FungibleResponse {
    data: Fungible,
}

#[derive(Debug, Deserialize)]
struct Fungible {
    id: String,
    attributes: FungibleAttributes,
}

#[derive(Debug, Deserialize)]
struct FungibleAttributes {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    icon: Option<Icon>,
    #[serde(default)]
    implementations: Option<Vec<Implementation>>,
    #[serde(default)]
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct Icon {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Implementation {
    chain_id: String,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    market_cap: Option<Decimal>,
    #[serde(default)]
    changes: Option<Changes>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ZerionClient {
    http: Client,
    config: ZerionConfig,
}

impl ZerionClient {
    pub fn new(config: ZerionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("battlesettle/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build Zerion HTTP client")?;
        Ok(Self { http, config })
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        // Zerion takes the API key as the basic-auth username
        self.http
            .get(url)
            .basic_auth(self.config.api_key.expose_secret(), Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn positions(&self, address: &str) -> Result<Option<PositionsResponse>> {
        let url = format!("{}/wallets/{address}/positions/", self.config.base_url);
        let resp = self
            .get(url)
            .query(&[
                ("filter[positions]", "only_simple"),
                ("currency", "usd"),
                ("filter[chain_ids]", self.config.chain_id.as_str()),
                ("sort", "value"),
            ])
            .send()
            .await
            .context("Zerion positions request failed")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(
                resp.json().await.context("malformed Zerion positions payload")?,
            )),
            s => bail!("Zerion positions returned {s} for {address}"),
        }
    }

    async fn portfolio(&self, address: &str) -> Result<Option<PortfolioResponse>> {
        let url = format!("{}/wallets/{address}/portfolio/", self.config.base_url);
        let resp = self
            .get(url)
            .query(&[("currency", "usd")])
            .send()
            .await
            .context("Zerion portfolio request failed")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(
                resp.json().await.context("malformed Zerion portfolio payload")?,
            )),
            s => bail!("Zerion portfolio returned {s} for {address}"),
        }
    }
}

impl ZerionClient {
    async fn search_fungibles(&self, query: &str) -> Result<FungiblesResponse> {
        let url = format!("{}/fungibles/", self.config.base_url);
        let resp = self
            .get(url)
            .query(&[("currency", "usd"), ("filter[search_query]", query)])
            .send()
            .await
            .context("Zerion fungibles search failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Zerion fungibles search returned {status} for {query}");
        }

        resp.json().await.context("malformed Zerion fungibles payload")
    }

    async fn fungible(&self, token_id: &str) -> Result<Option<FungibleResponse>> {
        let url = format!("{}/fungibles/{token_id}", self.config.base_url);
        let resp = self
            .get(url)
            .query(&[("currency", "usd")])
            .send()
            .await
            .context("Zerion fungible request failed")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(
                resp.json().await.context("malformed Zerion fungible payload")?,
            )),
            s => bail!("Zerion fungible returned {s} for {token_id}"),
        }
    }
}

#[async_trait]
impl TokenMarketProvider for ZerionClient {
    async fn search_tokens(&self, symbol: &str) -> Result<Vec<TokenListing>> {
        let found = self.search_fungibles(symbol).await?;
        Ok(listings_matching(found, symbol, &self.config.chain_id))
    }

    async fn token_price(&self, token_id: &str) -> Result<Option<TokenPrice>> {
        Ok(self.fungible(token_id).await?.map(|f| quote(f.data)))
    }
}

#[async_trait]
impl WalletDataProvider for ZerionClient {
    async fn fetch_snapshot(&self, address: &str) -> Result<Option<ParticipantSnapshot>> {
        let (positions, portfolio) = tokio::try_join!(self.positions(address), self.portfolio(address))?;

        let (Some(positions), Some(portfolio)) = (positions, portfolio) else {
            debug!(%address, "wallet unknown to Zerion");
            return Ok(None);
        };

        let snapshot = build_snapshot(address, positions, portfolio, Utc::now());
        if snapshot.is_none() {
            warn!(%address, "Zerion returned no usable performance data");
        }
        Ok(snapshot)
    }
}

/// Checks the two payloads and turns them into a snapshot, or `None` when
/// the wallet holds no recognised tokens or has no 24h change.
fn build_snapshot(
    address: &str,
    positions: PositionsResponse,
    portfolio: PortfolioResponse,
    observed_at: DateTime<Utc>,
) -> Option<ParticipantSnapshot> {
    let performance_pct = portfolio.data.attributes.changes?.percent_1d?;

    let mut total_value = Decimal::ZERO;
    let mut tokens = Vec::new();

    for position in positions.data {
        let attrs = position.attributes;
        let value = attrs.value.unwrap_or(Decimal::ZERO);
        total_value += value;

        let fungible_id = position
            .relationships
            .and_then(|r| r.fungible)
            .and_then(|f| f.data)
            .map(|d| d.id);

        let (Some(info), Some(token_address)) = (attrs.fungible_info, fungible_id) else {
            continue;
        };

        tokens.push(TokenHolding {
            symbol: info.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            name: info.name.unwrap_or_else(|| "Unknown Token".to_string()),
            address: token_address,
            balance: attrs.quantity.map(|q| q.numeric).unwrap_or(Decimal::ZERO),
            value_usd: value,
            price_change_24h: attrs.changes.and_then(|c| c.percent_1d),
        });
    }

    if tokens.is_empty() {
        return None;
    }

    Some(ParticipantSnapshot {
        participant: address.to_string(),
        performance_pct,
        rank: 0,
        observed_at,
        total_value,
        tokens,
    })
}

/// Keeps search hits that are deployed on `chain_id`, carry a positive
/// price and whose symbol is exactly `symbol`. Search is fuzzy upstream.
fn listings_matching(found: FungiblesResponse, symbol: &str, chain_id: &str) -> Vec<TokenListing> {
    found
        .data
        .into_iter()
        .filter_map(|fungible| {
            let attrs = fungible.attributes;

            let on_chain = attrs
                .implementations
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|i| i.chain_id == chain_id);
            let token_symbol = attrs.symbol?;
            if !on_chain || !token_symbol.eq_ignore_ascii_case(symbol) {
                return None;
            }

            let market = attrs.market_data?;
            let price = market.price.filter(|p| p.is_sign_positive() && !p.is_zero())?;

            Some(TokenListing {
                id: fungible.id,
                symbol: token_symbol,
                name: attrs.name.unwrap_or_else(|| "Unknown Token".to_string()),
                price,
                change_24h: market.changes.and_then(|c| c.percent_1d),
                market_cap: market.market_cap,
                icon: attrs.icon.and_then(|i| i.url),
            })
        })
        .collect()
}

fn quote(fungible: Fungible) -> TokenPrice {
    let attrs = fungible.attributes;
    let market = attrs.market_data;

    TokenPrice {
        id: fungible.id,
        symbol: attrs.symbol,
        price: market.as_ref().and_then(|m| m.price),
        change_24h: market.and_then(|m| m.changes).and_then(|c| c.percent_1d),
    }
}
