//! Random closed multi-hop paths of four to six tokens

use chrono::Utc;
use tracing::debug;

use super::{best_hop, cycle_profit, priced_tokens, FinderConstraints, OpportunityFinder, ESTIMATED_MS_PER_HOP};
use crate::random::RandomSource;
use crate::rates::RateTable;
use crate::types::{
    ComplexOpportunity, Complexity, Opportunity, OpportunityKind, PriceSnapshot, RiskLevel, Token,
};

pub const MIN_PATH_TOKENS: usize = 4;
pub const MAX_PATH_TOKENS: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexFinder;

/// Random walk over `0..universe` visiting distinct tokens. The caller closes the loop.
fn random_path(universe: usize, rng: &mut dyn RandomSource) -> Vec<usize> {
    let span = MAX_PATH_TOKENS - MIN_PATH_TOKENS + 1;
    let len = (MIN_PATH_TOKENS + rng.index(span)).min(universe);

    let mut path = Vec::with_capacity(len);
    path.push(rng.index(universe));
    while path.len() < len {
        let candidates: Vec<usize> = (0..universe).filter(|i| !path.contains(i)).collect();
        path.push(candidates[rng.index(candidates.len())]);
    }
    path
}

impl OpportunityFinder for ComplexFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::Complex
    }

    fn find(
        &self,
        prices: &PriceSnapshot,
        rates: &RateTable,
        tokens: &[Token],
        constraints: &FinderConstraints,
        rng: &mut dyn RandomSource,
    ) -> Vec<Opportunity> {
        let priced = priced_tokens(tokens, prices);
        if priced.len() < MIN_PATH_TOKENS {
            return Vec::new();
        }
        let threshold = constraints.threshold_for(OpportunityKind::Complex);
        let now = Utc::now();
        let mut found = Vec::new();

        for _ in 0..constraints.complex_paths_per_tick {
            let path = random_path(priced.len(), rng);
            let Some(legs) = (0..path.len())
                .map(|k| {
                    let from = &priced[path[k]].symbol;
                    let to = &priced[path[(k + 1) % path.len()]].symbol;
                    best_hop(from, to, rates)
                })
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            let (profit, fee_factor) = cycle_profit(&legs);
            let profit_percent = profit.round_dp(8);
            if profit_percent < threshold {
                continue;
            }

            let hops = legs.len();
            let path: Vec<_> = legs.into_iter().map(|(hop, _)| hop).collect();
            debug!(hops, profit = %profit_percent, "Complex opportunity found");
            found.push(Opportunity::Complex(ComplexOpportunity {
                id: uuid::Uuid::new_v4().to_string(),
                path,
                fee_factor,
                profit_percent,
                estimated_profit: constraints.estimated_profit(profit_percent),
                complexity: Complexity::from_hops(hops),
                risk_level: RiskLevel::from_profit(profit_percent),
                estimated_execution_ms: hops as u64 * ESTIMATED_MS_PER_HOP,
                timestamp: now,
            }));
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::test_support::*;
    use crate::random::{SeededRandom, SequenceRandom};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    const PRICES: [(&str, Decimal); 7] = [
        ("SOL", dec!(100)),
        ("BTC", dec!(1000)),
        ("ETH", dec!(50)),
        ("USDC", dec!(1)),
        ("USDT", dec!(1)),
        ("JUP", dec!(2)),
        ("RAY", dec!(0.5)),
    ];

    #[test]
    fn paths_are_distinct_and_sized() {
        let mut rng = SeededRandom::from_seed(21);
        for _ in 0..200 {
            let path = random_path(7, &mut rng);
            assert!((MIN_PATH_TOKENS..=MAX_PATH_TOKENS).contains(&path.len()));
            let unique: HashSet<_> = path.iter().collect();
            assert_eq!(unique.len(), path.len());
            for pair in path.windows(2) {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn path_length_is_capped_by_universe() {
        let mut rng = SequenceRandom::constant(0.99);
        assert_eq!(random_path(4, &mut rng).len(), 4);
    }

    #[test]
    fn small_universe_yields_nothing() {
        let prices = &PRICES[..3];
        let table = flat_table(&[free_venue("A")], prices);
        let constraints = FinderConstraints {
            min_profit_threshold: dec!(-100),
            complex_min_profit_threshold: dec!(-100),
            ..FinderConstraints::default()
        };
        let found = ComplexFinder.find(
            &snapshot(prices),
            &table,
            &tokens(prices),
            &constraints,
            &mut SeededRandom::from_seed(1),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn emitted_paths_form_closed_loops() {
        let table = flat_table(&[free_venue("A")], &PRICES);
        let constraints = FinderConstraints {
            min_profit_threshold: dec!(-100),
            complex_min_profit_threshold: dec!(-100),
            complex_paths_per_tick: 10,
            ..FinderConstraints::default()
        };
        let found = ComplexFinder.find(
            &snapshot(&PRICES),
            &table,
            &tokens(&PRICES),
            &constraints,
            &mut SeededRandom::from_seed(8),
        );
        assert_eq!(found.len(), 10);
        for opp in &found {
            let Opportunity::Complex(opp) = opp else {
                panic!("expected a complex opportunity");
            };
            assert!(opp.path.len() >= MIN_PATH_TOKENS);
            assert_eq!(opp.path.first().unwrap().from, opp.path.last().unwrap().to);
            for pair in opp.path.windows(2) {
                assert_eq!(pair[0].to, pair[1].from);
            }
            assert_eq!(opp.complexity, Complexity::from_hops(opp.path.len()));
            assert_eq!(opp.profit_percent, Decimal::ZERO);
        }
    }

    #[test]
    fn stricter_complex_threshold_applies() {
        let table = flat_table(&[free_venue("A")], &PRICES);
        let constraints = FinderConstraints {
            min_profit_threshold: dec!(-1),
            complex_min_profit_threshold: dec!(0.01),
            complex_paths_per_tick: 10,
            ..FinderConstraints::default()
        };
        let found = ComplexFinder.find(
            &snapshot(&PRICES),
            &table,
            &tokens(&PRICES),
            &constraints,
            &mut SeededRandom::from_seed(8),
        );
        assert!(found.is_empty());
    }
}
