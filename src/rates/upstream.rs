//! Overlay of upstream venue quotes onto a synthesized rate table

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::CircuitBreaker;
use crate::rates::{RateSource, RateTable};
use crate::types::{PriceSnapshot, Token};

const UPSTREAM_MAX_CONSECUTIVE_ERRORS: u32 = 3;
const UPSTREAM_COOLDOWN: Duration = Duration::from_secs(60);

pub struct UpstreamRates {
    source: Arc<dyn RateSource>,
    quote_symbol: String,
    breaker: CircuitBreaker,
}

impl UpstreamRates {
    pub fn new(source: Arc<dyn RateSource>, quote_symbol: &str) -> Self {
        Self {
            source,
            quote_symbol: quote_symbol.to_string(),
            breaker: CircuitBreaker::new(UPSTREAM_MAX_CONSECUTIVE_ERRORS, UPSTREAM_COOLDOWN),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Replaces the source venue's synthesized rates with live quotes priced through the
    /// quote token. The synthesized spread is kept around the new bid. On the first
    /// failure the remaining tokens keep their synthesized rates. Returns how many rates
    /// were replaced.
    pub async fn apply(&self, table: &mut RateTable, prices: &PriceSnapshot, tokens: &[Token]) -> usize {
        let venue = self.source.venue_id();
        if table.venue(venue).is_none() {
            return 0;
        }
        let Some(quote_token) = tokens.iter().find(|t| t.symbol == self.quote_symbol) else {
            return 0;
        };
        let Some(quote_price) = prices.price(&self.quote_symbol) else {
            return 0;
        };
        if !self.breaker.can_proceed().await {
            debug!("Upstream {} quotes skipped while circuit breaker is open", self.source.name());
            return 0;
        }

        let mut replaced = 0;
        for token in tokens.iter().filter(|t| t.symbol != self.quote_symbol) {
            let Some(spread) = table.get(&token.symbol, venue).map(|r| r.ask - r.bid) else {
                continue;
            };
            match self.source.quote(token, quote_token, Decimal::ONE).await {
                Ok(quote) => {
                    let bid = quote.rate * quote_price;
                    if bid <= Decimal::ZERO {
                        continue;
                    }
                    table.insert_quote(&token.symbol, venue, bid, bid + spread);
                    replaced += 1;
                }
                Err(e) => {
                    warn!(
                        "⚠️ Upstream {} quote for {} unavailable, keeping synthesized rates: {}",
                        self.source.name(),
                        token.symbol,
                        e
                    );
                    if self.breaker.record_error().await {
                        info!("Upstream {} paused for {:?}", self.source.name(), UPSTREAM_COOLDOWN);
                    }
                    return replaced;
                }
            }
        }

        self.breaker.record_success().await;
        debug!(venue, replaced, "Upstream venue rates applied");
        replaced
    }
}
