//! Three-hop cycles starting and ending at a base token

use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;

use super::{best_hop, cycle_profit, priced_tokens, FinderConstraints, OpportunityFinder, ESTIMATED_MS_PER_HOP};
use crate::random::RandomSource;
use crate::rates::RateTable;
use crate::types::{
    Opportunity, OpportunityKind, PriceSnapshot, RiskLevel, Token, TriangularOpportunity,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TriangularFinder;

/// Ordered `(b, c)` index pairs into `others`, sampled without repeats.
fn sample_pairs(
    count: usize,
    samples: usize,
    rng: &mut dyn RandomSource,
) -> Vec<(usize, usize)> {
    let total = count * count.saturating_sub(1);
    if samples >= total {
        return (0..count)
            .flat_map(|b| (0..count).filter(move |c| *c != b).map(move |c| (b, c)))
            .collect();
    }

    let mut seen = HashSet::new();
    let mut pairs = Vec::with_capacity(samples);
    let mut attempts = 0;
    while pairs.len() < samples && attempts < samples * 8 {
        attempts += 1;
        let b = rng.index(count);
        let c = rng.index(count);
        if b != c && seen.insert((b, c)) {
            pairs.push((b, c));
        }
    }
    pairs
}

impl OpportunityFinder for TriangularFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::Triangular
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
        let threshold = constraints.threshold_for(OpportunityKind::Triangular);
        let now = Utc::now();
        let mut found = Vec::new();

        for base in &constraints.triangular_bases {
            if !priced.iter().any(|t| &t.symbol == base) {
                continue;
            }
            let others: Vec<&str> = priced
                .iter()
                .map(|t| t.symbol.as_str())
                .filter(|s| *s != base.as_str())
                .collect();
            if others.len() < 2 {
                continue;
            }

            for (b, c) in sample_pairs(others.len(), constraints.triangle_samples_per_base, rng) {
                let cycle = [(base.as_str(), others[b]), (others[b], others[c]), (others[c], base.as_str())];
                let Some(legs) = cycle
                    .iter()
                    .map(|(from, to)| best_hop(from, to, rates))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };

                let (profit, fee_factor) = cycle_profit(&legs);
                let profit_percent = profit.round_dp(8);
                if profit_percent < threshold {
                    continue;
                }

                let route: Vec<_> = legs.into_iter().map(|(hop, _)| hop).collect();
                debug!(
                    base = %base,
                    route = %format!("{} → {} → {} → {}", base, others[b], others[c], base),
                    profit = %profit_percent,
                    "Triangular opportunity found"
                );
                found.push(Opportunity::Triangular(TriangularOpportunity {
                    id: uuid::Uuid::new_v4().to_string(),
                    base_token: base.clone(),
                    route,
                    fee_factor,
                    profit_percent,
                    estimated_profit: constraints.estimated_profit(profit_percent),
                    risk_level: RiskLevel::from_profit(profit_percent),
                    estimated_execution_ms: 3 * ESTIMATED_MS_PER_HOP,
                    timestamp: now,
                }));
            }
        }
        found
    }
}
