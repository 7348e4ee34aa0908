//! Per-tick merge, ranking and atomic publication of opportunities

use chrono::Utc;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::arbitrage::{FinderConstraints, OpportunityFinder};
use crate::events::{EngineEvent, EventBus};
use crate::random::SharedRandom;
use crate::rates::RateTable;
use crate::storage::{save_opportunity_set, BoundedLog};
use crate::types::{Opportunity, OpportunityKind, OpportunitySet, PriceSnapshot, Token};

/// Drops sub-threshold entries, sorts by descending profit and keeps the top `max`.
pub fn rank_bucket(mut bucket: Vec<Opportunity>, threshold: Decimal, max: usize) -> Vec<Opportunity> {
    bucket.retain(|o| o.profit_percent() >= threshold);
    bucket.sort_by(|a, b| b.profit_percent().cmp(&a.profit_percent()));
    bucket.truncate(max);
    bucket
}

pub struct OpportunityFeed {
    finders: Vec<Box<dyn OpportunityFinder>>,
    max_per_bucket: AtomicUsize,
    sender: watch::Sender<Arc<OpportunitySet>>,
    history: RwLock<BoundedLog<Opportunity>>,
    events: EventBus,
    output_dir: Option<PathBuf>,
}

impl OpportunityFeed {
    pub fn new(
        finders: Vec<Box<dyn OpportunityFinder>>,
        max_per_bucket: usize,
        history_capacity: usize,
        events: EventBus,
    ) -> Self {
        let (sender, _) = watch::channel(Arc::new(OpportunitySet::empty()));
        Self {
            finders,
            max_per_bucket: AtomicUsize::new(max_per_bucket),
            sender,
            history: RwLock::new(BoundedLog::new(history_capacity)),
            events,
            output_dir: None,
        }
    }

    /// Appends every non-empty published set to a daily JSONL file under `dir`.
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn set_max_per_bucket(&self, max: usize) {
        self.max_per_bucket.store(max, Ordering::Relaxed);
    }

    /// Runs every finder once and publishes the ranked result. Never fails; an
    /// empty market publishes empty buckets.
    pub async fn tick(
        &self,
        prices: &PriceSnapshot,
        rates: &RateTable,
        tokens: &[Token],
        constraints: &FinderConstraints,
        random: &SharedRandom,
    ) -> Arc<OpportunitySet> {
        let candidates: Vec<Opportunity> = random.with(|rng| {
            let mut all = Vec::new();
            for finder in &self.finders {
                all.extend(finder.find(prices, rates, tokens, constraints, rng));
            }
            all
        });
        let found = candidates.len();

        let (mut simple, mut triangular, mut complex) = (Vec::new(), Vec::new(), Vec::new());
        for opp in candidates {
            match opp.kind() {
                OpportunityKind::Simple => simple.push(opp),
                OpportunityKind::Triangular => triangular.push(opp),
                OpportunityKind::Complex => complex.push(opp),
            }
        }

        let max = self.max_per_bucket.load(Ordering::Relaxed);
        let set = Arc::new(OpportunitySet {
            simple: rank_bucket(simple, constraints.threshold_for(OpportunityKind::Simple), max),
            triangular: rank_bucket(triangular, constraints.threshold_for(OpportunityKind::Triangular), max),
            complex: rank_bucket(complex, constraints.threshold_for(OpportunityKind::Complex), max),
            timestamp: Utc::now(),
        });

        self.sender.send_replace(set.clone());
        {
            let mut history = self.history.write().await;
            for opp in set.iter() {
                history.push(opp.clone());
            }
        }
        debug!(
            found,
            published = set.len(),
            simple = set.simple.len(),
            triangular = set.triangular.len(),
            complex = set.complex.len(),
            "Opportunity feed tick"
        );

        if let Some(dir) = &self.output_dir {
            if let Err(e) = save_opportunity_set(dir, &set) {
                warn!("⚠️ Failed to save opportunity set: {}", e);
            }
        }
        self.events.publish(EngineEvent::OpportunitiesUpdated(set.clone()));
        set
    }

    /// Most recently published set.
    pub fn latest(&self) -> Arc<OpportunitySet> {
        self.sender.borrow().clone()
    }

    /// Receiver that always holds the latest complete set.
    pub fn subscribe(&self) -> watch::Receiver<Arc<OpportunitySet>> {
        self.sender.subscribe()
    }

    /// Published opportunities, oldest first.
    pub async fn history(&self) -> Vec<Opportunity> {
        self.history.read().await.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::test_support::*;
    use crate::arbitrage::{default_finders, SimpleFinder};
    use crate::types::{RiskLevel, SimpleOpportunity};
    use rust_decimal_macros::dec;

    fn simple(profit: Decimal) -> Opportunity {
        Opportunity::Simple(SimpleOpportunity {
            id: uuid::Uuid::new_v4().to_string(),
            from_token: "USDC".to_string(),
            to_token: "SOL".to_string(),
            buy_venue: "A".to_string(),
            sell_venue: "B".to_string(),
            buy_price: dec!(100),
            sell_price: dec!(100) + profit,
            profit_percent: profit,
            estimated_profit: profit,
            risk_level: RiskLevel::from_profit(profit),
            estimated_execution_ms: 500,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn ranking_sorts_filters_and_truncates() {
        let bucket = vec![
            simple(dec!(0.7)),
            simple(dec!(0.2)),
            simple(dec!(2.1)),
            simple(dec!(0.5)),
            simple(dec!(1.3)),
        ];
        let ranked = rank_bucket(bucket, dec!(0.5), 3);
        let profits: Vec<_> = ranked.iter().map(|o| o.profit_percent()).collect();
        assert_eq!(profits, vec![dec!(2.1), dec!(1.3), dec!(0.7)]);
    }

    #[tokio::test]
    async fn empty_market_publishes_empty_buckets() {
        let prices = [("SOL", dec!(100)), ("USDC", dec!(1))];
        let table = flat_table(&[free_venue("A"), free_venue("B")], &prices);
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let feed = OpportunityFeed::new(default_finders(), 5, 10, bus);

        let set = feed
            .tick(
                &snapshot(&prices),
                &table,
                &tokens(&prices),
                &FinderConstraints::default(),
                &SharedRandom::seeded(1),
            )
            .await;
        assert!(set.is_empty());
        assert!(matches!(events.recv().await, Ok(EngineEvent::OpportunitiesUpdated(s)) if s.is_empty()));
    }

    #[tokio::test]
    async fn publication_replaces_previous_set() {
        let prices = [("SOL", dec!(120)), ("USDC", dec!(1))];
        let mut table = flat_table(&[free_venue("A"), free_venue("B")], &prices);
        table.insert_quote("SOL", "A", dec!(119), dec!(120));
        table.insert_quote("SOL", "B", dec!(121.8), dec!(122));

        let feed = OpportunityFeed::new(vec![Box::new(SimpleFinder)], 5, 10, EventBus::default());
        let mut rx = feed.subscribe();
        assert!(feed.latest().is_empty());

        let published = feed
            .tick(
                &snapshot(&prices),
                &table,
                &tokens(&prices),
                &FinderConstraints::default(),
                &SharedRandom::seeded(1),
            )
            .await;
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(Arc::ptr_eq(&seen, &published));
        assert_eq!(published.simple.len(), 1);
        assert_eq!(feed.history().await.len(), 1);
    }
}
