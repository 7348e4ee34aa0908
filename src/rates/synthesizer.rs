//! Per-venue bid/ask synthesis from base prices

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::random::RandomSource;
use crate::types::{PriceSnapshot, Venue, VenueRate};

const BASE_SPREAD: Decimal = dec!(0.006);
const SPREAD_PER_LIQUIDITY_STEP: Decimal = dec!(0.001);

/// Rates for every (token, venue) pair of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RateTable {
    venues: Vec<Venue>,
    rates: HashMap<(String, String), VenueRate>,
    pub timestamp: DateTime<Utc>,
}

impl RateTable {
    pub fn new(venues: Vec<Venue>) -> Self {
        Self {
            venues,
            rates: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn insert(&mut self, rate: VenueRate) {
        self.rates
            .insert((rate.token.clone(), rate.venue.clone()), rate);
    }

    /// Inserts a rate with explicit quotes; `rate` is the bid/ask midpoint.
    pub fn insert_quote(&mut self, token: &str, venue: &str, bid: Decimal, ask: Decimal) {
        self.insert(VenueRate {
            token: token.to_string(),
            venue: venue.to_string(),
            rate: (bid + ask) / dec!(2),
            bid,
            ask,
            timestamp: self.timestamp,
        });
    }

    pub fn get(&self, token: &str, venue: &str) -> Option<&VenueRate> {
        self.rates.get(&(token.to_string(), venue.to_string()))
    }

    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    pub fn venue(&self, id: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.id == id)
    }

    pub fn rates(&self) -> impl Iterator<Item = &VenueRate> {
        self.rates.values()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RateSynthesizer {
    /// Maximum random jitter per quote, in percent.
    jitter_pct: f64,
}

impl RateSynthesizer {
    pub fn new(jitter_pct: f64) -> Self {
        Self {
            jitter_pct: jitter_pct.max(0.0),
        }
    }

    pub fn jitter_pct(&self) -> f64 {
        self.jitter_pct
    }

    /// Tokens without a usable price get no rates.
    pub fn synthesize(
        &self,
        prices: &PriceSnapshot,
        venues: &[Venue],
        rng: &mut dyn RandomSource,
    ) -> RateTable {
        let mut table = RateTable::new(venues.to_vec());
        let timestamp = table.timestamp;

        for symbol in prices.quotes.keys() {
            let Some(price) = prices.price(symbol) else {
                continue;
            };
            for venue in venues {
                let jitter = (2.0 * rng.next_f64() - 1.0) * self.jitter_pct / 100.0;
                let offset = venue_bias(&venue.id) + Decimal::from_f64(jitter).unwrap_or(Decimal::ZERO);
                let mid = (price * (Decimal::ONE + offset)).round_dp(10);
                let half_spread = mid * spread_factor(venue.liquidity_rating) / dec!(2);

                table.insert(VenueRate {
                    token: symbol.clone(),
                    venue: venue.id.clone(),
                    rate: mid,
                    bid: (mid - half_spread).round_dp(10),
                    ask: (mid + half_spread).round_dp(10),
                    timestamp,
                });
            }
        }
        table
    }
}

impl Default for RateSynthesizer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RATE_JITTER_PCT)
    }
}

/// Fixed offset in `[-0.5%, +0.5%]`, a pure function of the venue id.
pub fn venue_bias(venue_id: &str) -> Decimal {
    let hash = venue_id
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    Decimal::from((hash % 11) as i64 - 5) / dec!(1000)
}

/// Relative bid/ask spread; deeper venues (higher rating) quote tighter.
pub fn spread_factor(liquidity_rating: u8) -> Decimal {
    BASE_SPREAD - SPREAD_PER_LIQUIDITY_STEP * Decimal::from(liquidity_rating.clamp(1, 5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VENUES;
    use crate::random::{SeededRandom, SequenceRandom};
    use crate::types::{PriceQuote, QuoteSource};

    fn snapshot(prices: &[(&str, Decimal)]) -> PriceSnapshot {
        PriceSnapshot::from_quotes(prices.iter().map(|(symbol, price)| PriceQuote {
            token: symbol.to_string(),
            price: *price,
            change_24h: Decimal::ZERO,
            last_updated: Utc::now(),
            source: QuoteSource::Synthetic,
        }))
    }

    #[test]
    fn bias_is_deterministic_and_bounded() {
        for venue in DEFAULT_VENUES.iter() {
            let bias = venue_bias(&venue.id);
            assert_eq!(bias, venue_bias(&venue.id));
            assert!(bias.abs() <= dec!(0.005));
        }
        let biases: Vec<_> = DEFAULT_VENUES.iter().map(|v| venue_bias(&v.id)).collect();
        assert!(biases.iter().any(|b| *b > Decimal::ZERO));
        assert!(biases.iter().any(|b| *b < Decimal::ZERO));
    }

    #[test]
    fn deeper_venues_quote_tighter_spreads() {
        assert_eq!(spread_factor(5), dec!(0.001));
        assert_eq!(spread_factor(1), dec!(0.005));
        assert_eq!(spread_factor(0), spread_factor(1));
        assert!(spread_factor(4) < spread_factor(3));
    }

    #[test]
    fn without_jitter_rates_follow_bias() {
        let venues = vec![Venue::new("a", "A", Decimal::ZERO, Decimal::ZERO, 5)];
        let table = RateSynthesizer::new(0.0).synthesize(
            &snapshot(&[("SOL", dec!(100))]),
            &venues,
            &mut SequenceRandom::constant(0.5),
        );
        let rate = table.get("SOL", "a").unwrap();
        assert_eq!(rate.rate, dec!(100) * (Decimal::ONE + venue_bias("a")));
        assert!(rate.bid < rate.rate && rate.rate < rate.ask);
        assert_eq!(rate.ask - rate.bid, rate.rate * dec!(0.001));
    }

    #[test]
    fn skips_tokens_without_price() {
        let table = RateSynthesizer::default().synthesize(
            &snapshot(&[("SOL", dec!(120)), ("DEAD", Decimal::ZERO)]),
            &DEFAULT_VENUES,
            &mut SeededRandom::from_seed(11),
        );
        assert_eq!(table.len(), DEFAULT_VENUES.len());
        assert!(table.get("DEAD", "jupiter").is_none());
    }

    #[test]
    fn jitter_stays_within_bound() {
        let venues = vec![Venue::new("a", "A", Decimal::ZERO, Decimal::ZERO, 5)];
        let synth = RateSynthesizer::new(2.0);
        let mut rng = SeededRandom::from_seed(5);
        let center = dec!(100) * (Decimal::ONE + venue_bias("a"));
        for _ in 0..200 {
            let table = synth.synthesize(&snapshot(&[("SOL", dec!(100))]), &venues, &mut rng);
            let rate = table.get("SOL", "a").unwrap().rate;
            assert!((rate - center).abs() <= dec!(2.0001));
        }
    }
}
