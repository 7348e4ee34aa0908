//! Jupiter swap-quote client

use async_trait::async_trait;
use rust_decimal::prelude::*;
use serde_json::Value;
use tracing::debug;
use crate::{
    errors::{SimError, SimResult},
    network::http::{build_client, get_json},
    network::retry::{fetch_with_retry, RetryConfig},
    rates::{RateSource, SwapQuote},
    types::Token,
};

pub const JUPITER_VENUE_ID: &str = "jupiter";
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

pub struct JupiterQuoteSource {
    client: reqwest::Client,
    base_url: String,
    slippage_bps: u32,
    retry: RetryConfig,
}

impl JupiterQuoteSource {
    pub fn new(base_url: &str) -> SimResult<Self> {
        Ok(Self {
            client: build_client("jupiter")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
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

    pub fn with_slippage_bps(mut self, slippage_bps: u32) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    fn request_url(&self, input_mint: &str, output_mint: &str, amount: u64) -> String {
        format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.base_url, input_mint, output_mint, amount, self.slippage_bps
        )
    }
}

fn decimal_scale(decimals: u32) -> Option<Decimal> {
    10u64.checked_pow(decimals).map(Decimal::from)
}

/// `amount` whole tokens in the mint's smallest unit.
fn to_base_units(amount: Decimal, decimals: u32) -> Option<u64> {
    amount
        .checked_mul(decimal_scale(decimals)?)?
        .trunc()
        .to_u64()
        .filter(|units| *units > 0)
}

// Jupiter sends amounts as strings; tolerate plain numbers too.
fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn parse_quote(json: &Value, output_decimals: u32, amount: Decimal) -> Option<SwapQuote> {
    let out_amount = decimal_field(&json["outAmount"])?;
    let rate = out_amount
        .checked_div(decimal_scale(output_decimals)?)?
        .checked_div(amount)?;
    if rate <= Decimal::ZERO {
        return None;
    }
    Some(SwapQuote {
        rate: rate.round_dp(10),
        price_impact_pct: decimal_field(&json["priceImpactPct"]).unwrap_or(Decimal::ZERO),
    })
}

#[async_trait]
impl RateSource for JupiterQuoteSource {
    fn name(&self) -> &str {
        "jupiter"
    }

    fn venue_id(&self) -> &str {
        JUPITER_VENUE_ID
    }

    async fn quote(&self, from: &Token, to: &Token, amount: Decimal) -> SimResult<SwapQuote> {
        let (Some(input_mint), Some(output_mint)) = (from.mint.as_deref(), to.mint.as_deref()) else {
            let missing = if from.mint.is_none() { &from.symbol } else { &to.symbol };
            return Err(SimError::DataUnavailable {
                token: missing.clone(),
            });
        };
        let units = to_base_units(amount, from.decimals).ok_or_else(|| {
            SimError::upstream(format!("Cannot quote {} {}", amount, from.symbol))
        })?;

        let url = self.request_url(input_mint, output_mint, units);
        let request = format!("quote {} → {}", from.symbol, to.symbol);
        let json = fetch_with_retry(self.name(), &request, &self.retry, || {
            get_json(&self.client, &url)
        })
        .await?;

        let quote = parse_quote(&json, to.decimals, amount).ok_or_else(|| {
            SimError::upstream(format!("Jupiter {} returned no usable outAmount", request))
        })?;
        debug!(
            from = %from.symbol,
            to = %to.symbol,
            rate = %quote.rate,
            impact = %quote.price_impact_pct,
            "Jupiter quote fetched"
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scales_amounts_by_mint_decimals() {
        assert_eq!(to_base_units(dec!(1), 9), Some(1_000_000_000));
        assert_eq!(to_base_units(dec!(0.5), 6), Some(500_000));
        assert_eq!(to_base_units(dec!(0.0000001), 6), None);
        assert_eq!(to_base_units(dec!(1), 25), None);
    }

    #[test]
    fn parses_string_and_numeric_out_amounts() {
        let json = serde_json::json!({ "outAmount": "142500000", "priceImpactPct": "0.012" });
        let quote = parse_quote(&json, 6, dec!(1)).unwrap();
        assert_eq!(quote.rate, dec!(142.5));
        assert_eq!(quote.price_impact_pct, dec!(0.012));

        let json = serde_json::json!({ "outAmount": 71250000 });
        let quote = parse_quote(&json, 6, dec!(0.5)).unwrap();
        assert_eq!(quote.rate, dec!(142.5));
        assert_eq!(quote.price_impact_pct, Decimal::ZERO);

        assert!(parse_quote(&serde_json::json!({ "outAmount": "0" }), 6, dec!(1)).is_none());
        assert!(parse_quote(&serde_json::json!({}), 6, dec!(1)).is_none());
    }

    #[test]
    fn builds_quote_url() {
        let source = JupiterQuoteSource::new("https://quote.example/v6/").unwrap();
        assert_eq!(
            source.request_url("inMint", "outMint", 1_000),
            "https://quote.example/v6/quote?inputMint=inMint&outputMint=outMint&amount=1000&slippageBps=50"
        );
    }
}
