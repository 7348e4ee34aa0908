//! Opportunity finders over synthesized venue rates

pub mod complex;
pub mod simple;
pub mod triangular;

pub use complex::*;
pub use simple::*;
pub use triangular::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::{Config, DEFAULT_TRIANGULAR_BASES};
use crate::random::RandomSource;
use crate::rates::RateTable;
use crate::types::{Hop, Opportunity, OpportunityKind, PriceSnapshot, Token};

/// Rough wall-clock cost of one swap, used for `estimated_execution_ms`.
pub const ESTIMATED_MS_PER_HOP: u64 = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct FinderConstraints {
    pub min_profit_threshold: Decimal,
    pub complex_min_profit_threshold: Decimal,
    /// Notional trade size in the reference currency, for `estimated_profit`.
    pub trade_size: Decimal,
    pub venue_sample_size: usize,
    pub triangle_samples_per_base: usize,
    pub complex_paths_per_tick: usize,
    pub triangular_bases: Vec<String>,
}

impl FinderConstraints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_profit_threshold: config.min_profit_threshold,
            complex_min_profit_threshold: config.complex_min_profit_threshold,
            trade_size: config.trade_size_usd,
            venue_sample_size: config.venue_sample_size,
            triangle_samples_per_base: config.triangle_samples_per_base,
            complex_paths_per_tick: config.complex_paths_per_tick,
            triangular_bases: DEFAULT_TRIANGULAR_BASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn threshold_for(&self, kind: OpportunityKind) -> Decimal {
        kind.min_profit(self.min_profit_threshold, self.complex_min_profit_threshold)
    }

    pub fn estimated_profit(&self, profit_percent: Decimal) -> Decimal {
        (self.trade_size * profit_percent / dec!(100)).round_dp(6)
    }
}

impl Default for FinderConstraints {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One detection strategy. Pure over its inputs apart from `rng`.
pub trait OpportunityFinder: Send + Sync {
    fn kind(&self) -> OpportunityKind;

    fn find(
        &self,
        prices: &PriceSnapshot,
        rates: &RateTable,
        tokens: &[Token],
        constraints: &FinderConstraints,
        rng: &mut dyn RandomSource,
    ) -> Vec<Opportunity>;
}

/// The three standard finders in feed order.
pub fn default_finders() -> Vec<Box<dyn OpportunityFinder>> {
    vec![
        Box::new(SimpleFinder),
        Box::new(TriangularFinder),
        Box::new(ComplexFinder),
    ]
}

/// Tokens that have a usable price, in universe order.
pub(crate) fn priced_tokens<'a>(tokens: &'a [Token], prices: &PriceSnapshot) -> Vec<&'a Token> {
    tokens
        .iter()
        .filter(|t| prices.price(&t.symbol).is_some())
        .collect()
}

/// Picks `k` distinct indices out of `0..n` (partial Fisher-Yates). All of them when `k >= n`.
pub(crate) fn sample_indices(n: usize, k: usize, rng: &mut dyn RandomSource) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if k >= n {
        return indices;
    }
    for i in 0..k {
        let j = i + rng.index(n - i);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

/// Best venue for converting `from` into `to`: highest rate net of the venue fee.
/// Returns the hop and its fee multiplier `(1 - fee)`.
pub(crate) fn best_hop(from: &str, to: &str, rates: &RateTable) -> Option<(Hop, Decimal)> {
    let mut best: Option<(Hop, Decimal, Decimal)> = None;
    for venue in rates.venues() {
        let (Some(sell), Some(buy)) = (rates.get(from, &venue.id), rates.get(to, &venue.id)) else {
            continue;
        };
        if sell.bid <= Decimal::ZERO || buy.ask <= Decimal::ZERO {
            continue;
        }
        let Some(rate) = sell.bid.checked_div(buy.ask) else {
            continue;
        };
        let fee_multiplier = Decimal::ONE - venue.fee_rate;
        let net = rate * fee_multiplier;
        if best.as_ref().is_none_or(|(_, _, best_net)| net > *best_net) {
            best = Some((
                Hop {
                    from: from.to_string(),
                    to: to.to_string(),
                    venue: venue.name.clone(),
                    rate,
                },
                fee_multiplier,
                net,
            ));
        }
    }
    best.map(|(hop, fee_multiplier, _)| (hop, fee_multiplier))
}

/// Profit of a closed cycle: `(Π rate · Π (1 - fee) - 1) · 100`, plus the compounded fee factor.
pub(crate) fn cycle_profit(legs: &[(Hop, Decimal)]) -> (Decimal, Decimal) {
    let gross: Decimal = legs.iter().map(|(hop, _)| hop.rate).product();
    let fee_factor: Decimal = legs.iter().map(|(_, fee)| *fee).product();
    ((gross * fee_factor - Decimal::ONE) * dec!(100), fee_factor)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::rates::RateTable;
    use crate::types::{PriceQuote, PriceSnapshot, QuoteSource, Token, Venue};

    pub fn snapshot(prices: &[(&str, Decimal)]) -> PriceSnapshot {
        PriceSnapshot::from_quotes(prices.iter().map(|(symbol, price)| PriceQuote {
            token: symbol.to_string(),
            price: *price,
            change_24h: Decimal::ZERO,
            last_updated: Utc::now(),
            source: QuoteSource::Synthetic,
        }))
    }

    pub fn tokens(prices: &[(&str, Decimal)]) -> Vec<Token> {
        prices.iter().map(|(symbol, price)| Token::new(symbol, *price)).collect()
    }

    pub fn free_venue(id: &str) -> Venue {
        Venue::new(id, id, Decimal::ZERO, Decimal::ZERO, 5)
    }

    /// Every token quoted at `bid == ask == price` on every venue.
    pub fn flat_table(venues: &[Venue], prices: &[(&str, Decimal)]) -> RateTable {
        let mut table = RateTable::new(venues.to_vec());
        for venue in venues {
            for (symbol, price) in prices {
                table.insert_quote(symbol, &venue.id, *price, *price);
            }
        }
        table
    }
}
