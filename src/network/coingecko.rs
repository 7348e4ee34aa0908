//! CoinGecko simple-price client

use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::collections::HashMap;
use tracing::debug;
use crate::{
    errors::SimResult,
    network::http::{build_client, get_json},
    network::retry::{fetch_with_retry, RetryConfig},
    prices::{PriceSource, UpstreamQuote},
    types::Token,
};

pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl CoinGeckoSource {
    pub fn new(base_url: &str) -> SimResult<Self> {
        Ok(Self {
            client: build_client("coingecko")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 200,
                ..Default::default()
            },
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn request_url(&self, ids: &[&str]) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        )
    }
}

/// Maps a `{"<id>": {"usd": .., "usd_24h_change": ..}}` body back onto token symbols.
fn parse_simple_price(
    json: &serde_json::Value,
    tokens: &[Token],
) -> HashMap<String, UpstreamQuote> {
    let mut quotes = HashMap::new();
    for token in tokens {
        let Some(id) = token.upstream_id.as_deref() else {
            continue;
        };
        let entry = &json[id];
        let Some(price) = entry["usd"].as_f64().and_then(Decimal::from_f64) else {
            continue;
        };
        if price <= Decimal::ZERO {
            continue;
        }
        let change_24h = entry["usd_24h_change"]
            .as_f64()
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO)
            .round_dp(4);
        quotes.insert(token.symbol.clone(), UpstreamQuote { price, change_24h });
    }
    quotes
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch(&self, tokens: &[Token]) -> SimResult<HashMap<String, UpstreamQuote>> {
        let ids: Vec<&str> = tokens
            .iter()
            .filter_map(|t| t.upstream_id.as_deref())
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = self.request_url(&ids);

        let json = fetch_with_retry(self.name(), "simple price", &self.retry, || {
            get_json(&self.client, &url)
        })
        .await?;
        let quotes = parse_simple_price(&json, tokens);
        debug!(requested = ids.len(), received = quotes.len(), "CoinGecko prices fetched");
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_known_ids_and_skips_the_rest() {
        let tokens = vec![
            Token::new("SOL", dec!(120)).with_upstream_id("solana"),
            Token::new("BTC", dec!(67000)).with_upstream_id("bitcoin"),
            Token::new("XYZ", dec!(1)),
        ];
        let json = serde_json::json!({
            "solana": { "usd": 142.5, "usd_24h_change": -1.25 },
            "bitcoin": { "usd": 0.0 }
        });
        let quotes = parse_simple_price(&json, &tokens);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["SOL"].price, dec!(142.5));
        assert_eq!(quotes["SOL"].change_24h, dec!(-1.25));
    }

    #[test]
    fn builds_request_url() {
        let source = CoinGeckoSource::new("http://localhost:1234/api/v3/").unwrap();
        assert_eq!(
            source.request_url(&["solana", "bitcoin"]),
            "http://localhost:1234/api/v3/simple/price?ids=solana,bitcoin&vs_currencies=usd&include_24hr_change=true"
        );
    }
}
