//! Token reference data and price quotes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable reference data for a tracked token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub name: Option<String>,
    /// Price in the reference currency at startup; anchors the random walk.
    pub reference_price: Decimal,
    /// Maximum relative move per synthetic refresh (0.005 == 0.5%).
    pub walk_step: f64,
    /// Identifier used by the upstream price API, if the token is listed there.
    pub upstream_id: Option<String>,
    /// SPL mint address, required for swap quotes.
    pub mint: Option<String>,
    /// On-chain decimals of the mint.
    pub decimals: u32,
}

impl Token {
    pub fn new(symbol: &str, reference_price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: None,
            reference_price,
            walk_step: 0.005,
            upstream_id: None,
            mint: None,
            decimals: 6,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_walk_step(mut self, walk_step: f64) -> Self {
        self.walk_step = walk_step;
        self
    }

    pub fn with_upstream_id(mut self, upstream_id: &str) -> Self {
        self.upstream_id = Some(upstream_id.to_string());
        self
    }

    pub fn with_mint(mut self, mint: &str, decimals: u32) -> Self {
        self.mint = Some(mint.to_string());
        self.decimals = decimals;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Upstream,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub token: String,
    pub price: Decimal,
    /// Percent change versus the reference price.
    pub change_24h: Decimal,
    pub last_updated: DateTime<Utc>,
    pub source: QuoteSource,
}

/// A complete, read-only view of the price cache at one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSnapshot {
    pub quotes: BTreeMap<String, PriceQuote>,
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn empty() -> Self {
        Self {
            quotes: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_quotes<I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = PriceQuote>,
    {
        Self {
            quotes: quotes.into_iter().map(|q| (q.token.clone(), q)).collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(symbol)
    }

    /// Usable price for `symbol`: `None` when unknown or not strictly positive.
    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.quotes
            .get(symbol)
            .map(|q| q.price)
            .filter(|p| *p > Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
