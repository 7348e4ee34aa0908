//! Synthetic gas price history and congestion level

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::{EngineEvent, EventBus};
use crate::random::{RandomSource, SharedRandom};
use crate::storage::BoundedLog;
use crate::types::{CongestionLevel, GasSample, GasStatus};

/// One day of samples at ten-minute spacing.
pub const GAS_HISTORY_CAPACITY: usize = 144;
/// Centre of the synthetic gas price, in Gwei.
pub const BASE_GAS_PRICE: f64 = 25.0;

const CYCLE_AMPLITUDE: f64 = 10.0;
const CYCLE_PERIOD_MS: f64 = 10_000_000.0;
const NOISE: f64 = 2.5;

/// Slow sine cycle around `BASE_GAS_PRICE` plus uniform noise of ±2.5 Gwei.
pub fn synthetic_gas_price(now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Decimal {
    let cycle = (now.timestamp_millis() as f64 / CYCLE_PERIOD_MS).sin() * CYCLE_AMPLITUDE;
    let price = BASE_GAS_PRICE + cycle + rng.range(-NOISE, NOISE);
    Decimal::from_f64(price)
        .unwrap_or_else(|| Decimal::from(25))
        .round_dp(4)
}

/// Owns the gas price history. Mutated only by `refresh`/`record`.
pub struct GasTracker {
    history: RwLock<BoundedLog<GasSample>>,
    status: RwLock<Option<GasStatus>>,
    random: SharedRandom,
    events: EventBus,
}

impl GasTracker {
    pub fn new(capacity: usize, random: SharedRandom, events: EventBus) -> Self {
        Self {
            history: RwLock::new(BoundedLog::new(capacity)),
            status: RwLock::new(None),
            random,
            events,
        }
    }

    /// Draws a new synthetic sample. Used by the gas timer.
    pub async fn refresh(&self) -> GasStatus {
        let now = Utc::now();
        let price = self.random.with(|rng| synthetic_gas_price(now, rng));
        self.record(price, now).await
    }

    /// Appends `price` and reclassifies congestion against the running average.
    pub async fn record(&self, price: Decimal, at: DateTime<Utc>) -> GasStatus {
        let status = {
            let mut history = self.history.write().await;
            history.push(GasSample { price, timestamp: at });
            let total: Decimal = history.iter().map(|s| s.price).sum();
            let average = (total / Decimal::from(history.len())).round_dp(4);
            GasStatus {
                current_price: price,
                average_price: average,
                congestion: CongestionLevel::classify(price, average),
                samples: history.len(),
                last_updated: at,
            }
        };
        *self.status.write().await = Some(status.clone());

        debug!(
            price = %status.current_price,
            average = %status.average_price,
            congestion = %status.congestion,
            "Gas status updated"
        );
        self.events.publish(EngineEvent::GasUpdated(status.clone()));
        status
    }

    /// `None` before the first sample.
    pub async fn status(&self) -> Option<GasStatus> {
        self.status.read().await.clone()
    }

    pub async fn current_price(&self) -> Option<Decimal> {
        self.status.read().await.as_ref().map(|s| s.current_price)
    }

    /// Normal until the first sample arrives.
    pub async fn congestion(&self) -> CongestionLevel {
        self.status
            .read()
            .await
            .as_ref()
            .map_or(CongestionLevel::Normal, |s| s.congestion)
    }

    /// Samples, oldest first.
    pub async fn history(&self) -> Vec<GasSample> {
        self.history.read().await.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use rust_decimal_macros::dec;

    fn tracker(capacity: usize) -> GasTracker {
        GasTracker::new(capacity, SharedRandom::seeded(1), EventBus::default())
    }

    #[tokio::test]
    async fn classifies_against_running_average() {
        let gas = tracker(GAS_HISTORY_CAPACITY);
        assert_eq!(gas.congestion().await, CongestionLevel::Normal);
        assert!(gas.status().await.is_none());

        let now = Utc::now();
        let first = gas.record(dec!(20), now).await;
        assert_eq!(first.congestion, CongestionLevel::Normal);
        gas.record(dec!(20), now).await;
        gas.record(dec!(20), now).await;

        // average 22.5, high band above 27
        let spike = gas.record(dec!(30), now).await;
        assert_eq!(spike.average_price, dec!(22.5));
        assert_eq!(spike.congestion, CongestionLevel::High);

        // average 21, low band below 16.8
        let dip = gas.record(dec!(15), now).await;
        assert_eq!(dip.average_price, dec!(21));
        assert_eq!(dip.congestion, CongestionLevel::Low);
        assert_eq!(gas.congestion().await, CongestionLevel::Low);
        assert_eq!(gas.current_price().await, Some(dec!(15)));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let gas = tracker(3);
        let now = Utc::now();
        for price in [dec!(10), dec!(20), dec!(30), dec!(40)] {
            gas.record(price, now).await;
        }
        let prices: Vec<Decimal> = gas.history().await.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![dec!(20), dec!(30), dec!(40)]);
        assert_eq!(gas.status().await.map(|s| s.average_price), Some(dec!(30)));
    }

    #[tokio::test]
    async fn refresh_publishes_status() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let gas = GasTracker::new(GAS_HISTORY_CAPACITY, SharedRandom::seeded(9), events);
        let status = gas.refresh().await;
        match rx.recv().await {
            Ok(EngineEvent::GasUpdated(published)) => assert_eq!(published, status),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn synthetic_price_stays_in_band() {
        let mut rng = SeededRandom::from_seed(5);
        let now = Utc::now();
        for _ in 0..500 {
            let price = synthetic_gas_price(now, &mut rng);
            assert!(price >= dec!(12.5) && price <= dec!(37.5), "gas price {}", price);
        }
    }
}
