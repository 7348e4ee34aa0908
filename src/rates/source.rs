//! Upstream swap-quote source abstraction

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::SimResult;
use crate::types::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapQuote {
    /// Units of the output token received per unit of the input token.
    pub rate: Decimal,
    pub price_impact_pct: Decimal,
}

/// A real venue's quoting endpoint. Failures are absorbed by the rate overlay.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Venue whose synthesized rates this source replaces.
    fn venue_id(&self) -> &str;

    async fn quote(&self, from: &Token, to: &Token, amount: Decimal) -> SimResult<SwapQuote>;
}
