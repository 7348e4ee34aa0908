//! TTL price cache with upstream fetch and synthetic fallback

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::errors::CircuitBreaker;
use crate::events::{EngineEvent, EventBus};
use crate::prices::random_walk::{change_vs_reference, next_price};
use crate::prices::{PriceSource, UpstreamQuote};
use crate::random::SharedRandom;
use crate::types::{PriceQuote, PriceSnapshot, QuoteSource, Token};

const UPSTREAM_MAX_CONSECUTIVE_ERRORS: u32 = 3;
const UPSTREAM_COOLDOWN: Duration = Duration::from_secs(60);

struct CacheState {
    snapshot: Arc<PriceSnapshot>,
    refreshed_at: Option<Instant>,
}

/// Sole owner of current prices. Readers get copies or a shared read-only snapshot.
pub struct PriceCache {
    tokens: Vec<Token>,
    ttl: RwLock<Duration>,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
    source: Option<Arc<dyn PriceSource>>,
    breaker: CircuitBreaker,
    random: SharedRandom,
    events: EventBus,
}

impl PriceCache {
    pub fn new(tokens: Vec<Token>, ttl: Duration, random: SharedRandom, events: EventBus) -> Self {
        Self {
            tokens,
            ttl: RwLock::new(ttl),
            state: RwLock::new(CacheState {
                snapshot: Arc::new(PriceSnapshot::empty()),
                refreshed_at: None,
            }),
            refresh_lock: Mutex::new(()),
            source: None,
            breaker: CircuitBreaker::new(UPSTREAM_MAX_CONSECUTIVE_ERRORS, UPSTREAM_COOLDOWN),
            random,
            events,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.set_source(source);
        self
    }

    pub fn set_source(&mut self, source: Arc<dyn PriceSource>) {
        self.source = Some(source);
    }

    /// Replaces the token universe and drops every cached quote.
    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
        let state = self.state.get_mut();
        state.snapshot = Arc::new(PriceSnapshot::empty());
        state.refreshed_at = None;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub async fn set_ttl(&self, ttl: Duration) {
        *self.ttl.write().await = ttl;
    }

    /// Latest quote for `symbol`, `None` before the first refresh or for unknown tokens.
    pub async fn get(&self, symbol: &str) -> Option<PriceQuote> {
        self.state.read().await.snapshot.get(symbol).cloned()
    }

    /// Current snapshot without refreshing.
    pub async fn snapshot(&self) -> Arc<PriceSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    /// Returns the cached snapshot while it is younger than the TTL, otherwise refreshes.
    pub async fn refresh_all(&self) -> Arc<PriceSnapshot> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot;
        }
        self.refresh_locked().await
    }

    /// Refreshes regardless of TTL. Used by the price timer.
    pub async fn force_refresh(&self) -> Arc<PriceSnapshot> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn fresh_snapshot(&self) -> Option<Arc<PriceSnapshot>> {
        let ttl = *self.ttl.read().await;
        let state = self.state.read().await;
        match state.refreshed_at {
            Some(at) if at.elapsed() < ttl => Some(state.snapshot.clone()),
            _ => None,
        }
    }

    async fn refresh_locked(&self) -> Arc<PriceSnapshot> {
        let upstream = self.fetch_upstream().await;
        let previous = self.snapshot().await;

        let now = Utc::now();
        let quotes: Vec<PriceQuote> = self.random.with(|rng| {
            self.tokens
                .iter()
                .map(|token| match upstream.get(&token.symbol) {
                    Some(quote) => PriceQuote {
                        token: token.symbol.clone(),
                        price: quote.price,
                        change_24h: quote.change_24h,
                        last_updated: now,
                        source: QuoteSource::Upstream,
                    },
                    None => {
                        let base = previous
                            .price(&token.symbol)
                            .unwrap_or(token.reference_price);
                        let price = next_price(base, token, rng);
                        PriceQuote {
                            token: token.symbol.clone(),
                            price,
                            change_24h: change_vs_reference(price, token),
                            last_updated: now,
                            source: QuoteSource::Synthetic,
                        }
                    }
                })
                .collect()
        });

        let snapshot = Arc::new(PriceSnapshot::from_quotes(quotes));
        {
            let mut state = self.state.write().await;
            state.snapshot = snapshot.clone();
            state.refreshed_at = Some(Instant::now());
        }

        debug!(
            tokens = snapshot.len(),
            upstream = upstream.len(),
            "Prices refreshed"
        );
        self.events.publish(EngineEvent::PricesUpdated(snapshot.clone()));
        snapshot
    }

    /// Upstream quotes, or an empty map when there is no source, the breaker is open,
    /// or the fetch fails.
    async fn fetch_upstream(&self) -> HashMap<String, UpstreamQuote> {
        let Some(source) = self.source.as_ref() else {
            return HashMap::new();
        };
        if !self.breaker.can_proceed().await {
            debug!("Upstream {} skipped while circuit breaker is open", source.name());
            return HashMap::new();
        }

        match source.fetch(&self.tokens).await {
            Ok(quotes) => {
                self.breaker.record_success().await;
                quotes
                    .into_iter()
                    .filter(|(_, q)| q.price > rust_decimal::Decimal::ZERO)
                    .collect()
            }
            Err(e) => {
                warn!("⚠️ Upstream {} unavailable, using synthetic prices: {}", source.name(), e);
                if self.breaker.record_error().await {
                    info!("Upstream {} paused for {:?}", source.name(), UPSTREAM_COOLDOWN);
                }
                HashMap::new()
            }
        }
    }
}
