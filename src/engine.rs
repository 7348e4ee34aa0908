//! Simulation engine: owns every component and the refresh, feed and gas timers

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::arbitrage::{default_finders, FinderConstraints};
use crate::config::{default_tokens, default_venues, Config, UPSTREAM_RATE_QUOTE_TOKEN};
use crate::errors::{SimError, SimResult};
use crate::events::{EngineEvent, EventBus};
use crate::execution::{ExecutionPolicy, ExecutionSimulator};
use crate::feed::OpportunityFeed;
use crate::gas::{GasTracker, GAS_HISTORY_CAPACITY};
use crate::network::{CoinGeckoSource, JupiterQuoteSource};
use crate::prices::{PriceCache, PriceSource};
use crate::random::SharedRandom;
use crate::rates::{RateSource, RateSynthesizer, UpstreamRates};
use crate::types::{
    CongestionLevel, ExecutionStats, GasSample, GasStatus, Opportunity, OpportunitySet,
    PriceQuote, PriceSnapshot, Token, TradeOutcome, Venue,
};

struct EngineInner {
    config: RwLock<Config>,
    venues: Vec<Venue>,
    prices: PriceCache,
    upstream_rates: Option<UpstreamRates>,
    gas: Arc<GasTracker>,
    feed: OpportunityFeed,
    simulator: Arc<ExecutionSimulator>,
    /// Auto-executed trades still in flight.
    trades: Mutex<JoinSet<()>>,
    random: SharedRandom,
    events: EventBus,
}

impl EngineInner {
    async fn run_cycle(&self) -> Arc<OpportunitySet> {
        let config = self.config.read().await.clone();
        let prices = self.prices.refresh_all().await;
        let venues = venues_under(&self.venues, self.gas.congestion().await);

        let synthesizer = RateSynthesizer::new(config.rate_jitter_pct);
        let mut rates = self
            .random
            .with(|rng| synthesizer.synthesize(&prices, &venues, rng));
        if let Some(upstream) = &self.upstream_rates {
            upstream.apply(&mut rates, &prices, self.prices.tokens()).await;
        }

        let constraints = FinderConstraints::from_config(&config);
        let set = self
            .feed
            .tick(&prices, &rates, self.prices.tokens(), &constraints, &self.random)
            .await;

        if config.auto_execute {
            if let Some(best) = set.best().cloned() {
                let simulator = self.simulator.clone();
                let mut trades = self.trades.lock().await;
                while trades.try_join_next().is_some() {}
                trades.spawn(async move {
                    simulator.execute(&best).await;
                });
            }
        }
        set
    }

    /// Waits for every auto-executed trade to record its outcome.
    async fn settle_trades(&self) {
        let mut trades = self.trades.lock().await;
        if !trades.is_empty() {
            info!(pending = trades.len(), "⏳ Waiting for in-flight trades to settle");
        }
        while let Some(result) = trades.join_next().await {
            if let Err(e) = result {
                warn!("⚠️ Auto-executed trade ended abnormally: {}", e);
            }
        }
    }
}

/// Venue table with gas costs scaled for the current congestion.
fn venues_under(venues: &[Venue], congestion: CongestionLevel) -> Vec<Venue> {
    let multiplier = congestion.gas_multiplier();
    venues
        .iter()
        .map(|venue| Venue {
            gas_cost: venue.gas_cost * multiplier,
            ..venue.clone()
        })
        .collect()
}

/// A spawned timer loop and its cancellation signal.
struct TimerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TimerTask {
    async fn stop(self, name: &str) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!("⚠️ {} timer ended abnormally: {}", name, e);
        }
    }
}

struct RunningTimers {
    prices: TimerTask,
    feed: TimerTask,
    gas: TimerTask,
}

/// One simulation instance with an explicit start/stop lifecycle.
pub struct SimulationEngine {
    inner: Arc<EngineInner>,
    timers: Mutex<Option<RunningTimers>>,
}

impl SimulationEngine {
    /// Validates `config` and wires the default token universe and venues. Upstream
    /// prices attach a CoinGecko source; upstream rates attach Jupiter swap quotes.
    pub fn new(config: Config, random: SharedRandom) -> SimResult<Self> {
        config.validate()?;

        let events = EventBus::default();
        let mut prices = PriceCache::new(default_tokens(), config.price_ttl(), random.clone(), events.clone());
        if config.enable_upstream_prices {
            prices.set_source(Arc::new(CoinGeckoSource::new(&config.upstream_price_url)?));
        }
        let upstream_rates = if config.enable_upstream_rates {
            let source = JupiterQuoteSource::new(&config.upstream_quote_url)?;
            Some(UpstreamRates::new(Arc::new(source), UPSTREAM_RATE_QUOTE_TOKEN))
        } else {
            None
        };
        let gas = Arc::new(GasTracker::new(GAS_HISTORY_CAPACITY, random.clone(), events.clone()));

        let mut feed = OpportunityFeed::new(
            default_finders(),
            config.max_opportunities_per_bucket,
            config.history_capacity,
            events.clone(),
        );
        let mut simulator = ExecutionSimulator::new(
            ExecutionPolicy::from_config(&config),
            config.max_concurrent_trades,
            config.history_capacity,
            random.clone(),
            events.clone(),
        )
        .with_gas_tracker(gas.clone());
        if let Some(dir) = &config.output_dir {
            feed = feed.with_output_dir(dir.clone());
            simulator = simulator.with_output_dir(dir.clone());
        }

        Ok(Self {
            inner: Arc::new(EngineInner {
                config: RwLock::new(config),
                venues: default_venues(),
                prices,
                upstream_rates,
                gas,
                feed,
                simulator: Arc::new(simulator),
                trades: Mutex::new(JoinSet::new()),
                random,
                events,
            }),
            timers: Mutex::new(None),
        })
    }

    /// Replaces the upstream price source. Must be called before `start`.
    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.prices.set_source(source),
            None => warn!("⚠️ Price source can only be replaced before the engine starts"),
        }
        self
    }

    /// Overlays live quotes from `source` onto its venue's synthesized rates. Must be
    /// called before `start`.
    pub fn with_rate_source(mut self, source: Arc<dyn RateSource>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.upstream_rates = Some(UpstreamRates::new(source, UPSTREAM_RATE_QUOTE_TOKEN))
            }
            None => warn!("⚠️ Rate source can only be replaced before the engine starts"),
        }
        self
    }

    /// Replaces the token universe. Must be called before `start`.
    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.prices.set_tokens(tokens),
            None => warn!("⚠️ Tokens can only be replaced before the engine starts"),
        }
        self
    }

    /// Replaces the venue table. Must be called before `start`.
    pub fn with_venues(mut self, venues: Vec<Venue>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.venues = venues,
            None => warn!("⚠️ Venues can only be replaced before the engine starts"),
        }
        self
    }

    /// Spawns the price-refresh, feed and gas-status timers.
    pub async fn start(&self) -> SimResult<()> {
        let mut timers = self.timers.lock().await;
        if timers.is_some() {
            return Err(SimError::EngineState {
                reason: "engine is already running".to_string(),
            });
        }

        let config = self.inner.config.read().await.clone();
        *timers = Some(RunningTimers {
            prices: self.spawn_price_timer(config.price_refresh_interval()),
            feed: self.spawn_feed_timer(config.tick_interval()),
            gas: self.spawn_gas_timer(config.gas_refresh_interval()),
        });
        info!(
            tick_ms = config.tick_interval_ms,
            price_refresh_ms = config.price_refresh_interval_ms,
            gas_refresh_ms = config.gas_refresh_interval_ms,
            "🚀 Simulation engine started"
        );
        Ok(())
    }

    /// Cancels the timers, waits for them to exit, then waits for in-flight auto-executed
    /// trades. Nothing executes after this returns. Stopping a stopped engine is a no-op.
    pub async fn stop(&self) -> SimResult<()> {
        let running = self.timers.lock().await.take();
        let was_running = running.is_some();
        if let Some(running) = running {
            running.prices.stop("price refresh").await;
            running.feed.stop("opportunity feed").await;
            running.gas.stop("gas status").await;
        }
        self.inner.settle_trades().await;
        if was_running {
            info!("📛 Simulation engine stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.timers.lock().await.is_some()
    }

    fn spawn_timer<F, Fut>(&self, name: &'static str, period: Duration, tick: F) -> TimerTask
    where
        F: Fn(Arc<EngineInner>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let inner = self.inner.clone();
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick(inner.clone()).await;
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("{} timer shutting down", name);
                        break;
                    }
                }
            }
        });
        TimerTask { shutdown, handle }
    }

    fn spawn_price_timer(&self, period: Duration) -> TimerTask {
        self.spawn_timer("Price refresh", period, |inner| async move {
            inner.prices.force_refresh().await;
        })
    }

    fn spawn_feed_timer(&self, period: Duration) -> TimerTask {
        self.spawn_timer("Opportunity feed", period, |inner| async move {
            inner.run_cycle().await;
        })
    }

    fn spawn_gas_timer(&self, period: Duration) -> TimerTask {
        self.spawn_timer("Gas status", period, |inner| async move {
            inner.gas.refresh().await;
        })
    }

    /// One refresh → synthesize → find → publish pass.
    pub async fn run_cycle(&self) -> Arc<OpportunitySet> {
        self.inner.run_cycle().await
    }

    /// Changes the feed period, restarting the feed timer if the engine is running.
    pub async fn set_tick_interval(&self, tick_interval_ms: u64) -> SimResult<()> {
        let mut config = self.config().await;
        config.tick_interval_ms = tick_interval_ms;
        self.update_config(config).await
    }

    /// Validates and applies a new configuration. Timers whose period changed are restarted.
    /// The concurrency cap, output directory, upstream source and reference data are fixed
    /// at construction.
    pub async fn update_config(&self, config: Config) -> SimResult<()> {
        config.validate()?;

        let previous = {
            let mut current = self.inner.config.write().await;
            std::mem::replace(&mut *current, config.clone())
        };
        self.inner.prices.set_ttl(config.price_ttl()).await;
        self.inner.feed.set_max_per_bucket(config.max_opportunities_per_bucket);
        self.inner
            .simulator
            .update_policy(ExecutionPolicy::from_config(&config))
            .await;
        if previous.max_concurrent_trades != config.max_concurrent_trades {
            warn!("⚠️ max_concurrent_trades changes take effect on the next engine instance");
        }

        let mut timers = self.timers.lock().await;
        if let Some(running) = timers.as_mut() {
            if previous.tick_interval_ms != config.tick_interval_ms {
                let old = std::mem::replace(&mut running.feed, self.spawn_feed_timer(config.tick_interval()));
                old.stop("opportunity feed").await;
            }
            if previous.price_refresh_interval_ms != config.price_refresh_interval_ms {
                let old = std::mem::replace(
                    &mut running.prices,
                    self.spawn_price_timer(config.price_refresh_interval()),
                );
                old.stop("price refresh").await;
            }
            if previous.gas_refresh_interval_ms != config.gas_refresh_interval_ms {
                let old = std::mem::replace(&mut running.gas, self.spawn_gas_timer(config.gas_refresh_interval()));
                old.stop("gas status").await;
            }
        }
        info!(
            tick_ms = config.tick_interval_ms,
            risk_profile = %config.risk_profile,
            min_profit = %config.min_profit_threshold,
            auto_execute = config.auto_execute,
            "Configuration updated"
        );
        Ok(())
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Receiver that always holds the latest published opportunity set.
    pub fn watch_opportunities(&self) -> watch::Receiver<Arc<OpportunitySet>> {
        self.inner.feed.subscribe()
    }

    pub async fn execute(&self, opportunity: &Opportunity) -> TradeOutcome {
        self.inner.simulator.execute(opportunity).await
    }

    pub async fn execute_with_timeout(&self, opportunity: &Opportunity, timeout: Duration) -> TradeOutcome {
        self.inner
            .simulator
            .execute_with_timeout(opportunity, timeout)
            .await
    }

    pub async fn config(&self) -> Config {
        self.inner.config.read().await.clone()
    }

    pub fn latest_opportunities(&self) -> Arc<OpportunitySet> {
        self.inner.feed.latest()
    }

    pub async fn price(&self, symbol: &str) -> Option<PriceQuote> {
        self.inner.prices.get(symbol).await
    }

    pub async fn prices(&self) -> Arc<PriceSnapshot> {
        self.inner.prices.snapshot().await
    }

    pub fn tokens(&self) -> &[Token] {
        self.inner.prices.tokens()
    }

    pub fn venues(&self) -> &[Venue] {
        &self.inner.venues
    }

    pub async fn history(&self) -> Vec<TradeOutcome> {
        self.inner.simulator.history().await
    }

    pub async fn opportunity_history(&self) -> Vec<Opportunity> {
        self.inner.feed.history().await
    }

    pub async fn stats(&self) -> ExecutionStats {
        self.inner.simulator.stats().await
    }

    /// `None` until the first gas refresh.
    pub async fn gas_status(&self) -> Option<GasStatus> {
        self.inner.gas.status().await
    }

    pub async fn gas_history(&self) -> Vec<GasSample> {
        self.inner.gas.history().await
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        if let Ok(mut timers) = self.timers.try_lock() {
            if let Some(running) = timers.take() {
                error!("Simulation engine dropped while running; aborting timers");
                running.prices.handle.abort();
                running.feed.handle.abort();
                running.gas.handle.abort();
            }
        }
        if let Ok(mut trades) = self.inner.trades.try_lock() {
            trades.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quiet_config() -> Config {
        Config {
            tick_interval_ms: 20,
            price_refresh_interval_ms: 20,
            gas_refresh_interval_ms: 20,
            min_latency_ms: 0,
            max_latency_ms: 0,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let config = Config {
            min_profit_threshold: dec!(-1),
            ..Config::default()
        };
        assert!(matches!(
            SimulationEngine::new(config, SharedRandom::seeded(1)),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn run_cycle_populates_prices_and_feed() {
        let engine = SimulationEngine::new(quiet_config(), SharedRandom::seeded(4)).unwrap();
        assert!(engine.price("SOL").await.is_none());

        let set = engine.run_cycle().await;
        for token in engine.tokens() {
            assert!(engine.price(&token.symbol).await.is_some());
        }
        assert!(Arc::ptr_eq(&set, &engine.latest_opportunities()));
        for bucket in [&set.simple, &set.triangular, &set.complex] {
            assert!(bucket.len() <= 5);
        }
    }

    #[tokio::test]
    async fn double_start_is_an_error_and_stop_is_idempotent() {
        let engine = SimulationEngine::new(quiet_config(), SharedRandom::seeded(2)).unwrap();
        engine.start().await.unwrap();
        assert!(engine.is_running().await);
        assert!(matches!(engine.start().await, Err(SimError::EngineState { .. })));

        engine.stop().await.unwrap();
        assert!(!engine.is_running().await);
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn zero_tick_interval_is_rejected() {
        let engine = SimulationEngine::new(quiet_config(), SharedRandom::seeded(2)).unwrap();
        assert!(engine.set_tick_interval(0).await.is_err());
        engine.set_tick_interval(50).await.unwrap();
        assert_eq!(engine.config().await.tick_interval_ms, 50);
    }

    #[test]
    fn congestion_scales_every_venue() {
        let venues = default_venues();
        let busy = venues_under(&venues, CongestionLevel::High);
        for (base, scaled) in venues.iter().zip(&busy) {
            assert_eq!(scaled.id, base.id);
            assert_eq!(scaled.fee_rate, base.fee_rate);
            assert_eq!(scaled.gas_cost, base.gas_cost * dec!(1.5));
        }
        assert_eq!(venues_under(&venues, CongestionLevel::Normal), venues);
    }

    #[tokio::test]
    async fn gas_timer_publishes_status() {
        let engine = SimulationEngine::new(quiet_config(), SharedRandom::seeded(6)).unwrap();
        let mut events = engine.subscribe();
        assert!(engine.gas_status().await.is_none());

        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(70)).await;
        engine.stop().await.unwrap();

        let status = engine.gas_status().await.unwrap();
        assert!(status.samples >= 2);
        assert_eq!(engine.gas_history().await.len(), status.samples);
        let mut saw_gas = false;
        loop {
            match events.try_recv() {
                Ok(event) => saw_gas |= matches!(event, EngineEvent::GasUpdated(_)),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(saw_gas);
    }
}
