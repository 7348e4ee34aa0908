//! Upstream price source abstraction

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::SimResult;
use crate::types::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpstreamQuote {
    pub price: Decimal,
    /// Percent change over 24h as reported upstream.
    pub change_24h: Decimal,
}

/// A best-effort real price feed. Errors are recovered by the cache, never surfaced.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Quotes keyed by token symbol. Tokens may be missing from the answer.
    async fn fetch(&self, tokens: &[Token]) -> SimResult<HashMap<String, UpstreamQuote>>;
}
