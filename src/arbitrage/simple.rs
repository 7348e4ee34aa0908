//! Two-venue buy-low/sell-high detection for token pairs

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::{priced_tokens, sample_indices, FinderConstraints, OpportunityFinder, ESTIMATED_MS_PER_HOP};
use crate::random::RandomSource;
use crate::rates::RateTable;
use crate::types::{
    Opportunity, OpportunityKind, PriceSnapshot, RiskLevel, SimpleOpportunity, Token, Venue,
};

/// For each pair, buys the base token where it is cheapest and sells where it is dearest,
/// both priced in the quote token.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFinder;

/// Effective `(buy, sell)` price of `base` in units of `quote` on `venue`,
/// fees and gas included.
fn effective_prices(
    base: &Token,
    quote: &Token,
    quote_price: Decimal,
    venue: &Venue,
    rates: &RateTable,
) -> Option<(Decimal, Decimal)> {
    let base_rate = rates.get(&base.symbol, &venue.id)?;
    let quote_rate = rates.get(&quote.symbol, &venue.id)?;
    if base_rate.bid <= Decimal::ZERO || quote_rate.bid <= Decimal::ZERO || quote_rate.ask <= Decimal::ZERO {
        return None;
    }

    let cross_ask = base_rate.ask.checked_div(quote_rate.bid)?;
    let cross_bid = base_rate.bid.checked_div(quote_rate.ask)?;
    let gas = venue.gas_cost.checked_div(quote_price)?;

    let buy = cross_ask * (Decimal::ONE + venue.fee_rate) + gas;
    let sell = cross_bid * (Decimal::ONE - venue.fee_rate) - gas;
    Some((buy, sell))
}

impl OpportunityFinder for SimpleFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::Simple
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
        let threshold = constraints.threshold_for(OpportunityKind::Simple);
        let venues = rates.venues();
        let now = Utc::now();
        let mut found = Vec::new();

        for (i, base) in priced.iter().enumerate() {
            for quote in &priced[i + 1..] {
                let Some(quote_price) = prices.price(&quote.symbol) else {
                    continue;
                };

                let mut best_buy: Option<(&Venue, Decimal)> = None;
                let mut best_sell: Option<(&Venue, Decimal)> = None;
                for idx in sample_indices(venues.len(), constraints.venue_sample_size, rng) {
                    let venue = &venues[idx];
                    let Some((buy, sell)) = effective_prices(base, quote, quote_price, venue, rates) else {
                        continue;
                    };
                    if best_buy.is_none_or(|(_, best)| buy < best) {
                        best_buy = Some((venue, buy));
                    }
                    if best_sell.is_none_or(|(_, best)| sell > best) {
                        best_sell = Some((venue, sell));
                    }
                }

                let (Some((buy_venue, buy_price)), Some((sell_venue, sell_price))) = (best_buy, best_sell) else {
                    continue;
                };
                if buy_venue.id == sell_venue.id || buy_price <= Decimal::ZERO {
                    continue;
                }

                let profit_percent = ((sell_price / buy_price - Decimal::ONE) * dec!(100)).round_dp(8);
                if profit_percent < threshold {
                    continue;
                }

                debug!(
                    pair = %format!("{}/{}", base.symbol, quote.symbol),
                    buy_venue = %buy_venue.name,
                    sell_venue = %sell_venue.name,
                    profit = %profit_percent,
                    "Simple opportunity found"
                );
                found.push(Opportunity::Simple(SimpleOpportunity {
                    id: uuid::Uuid::new_v4().to_string(),
                    from_token: quote.symbol.clone(),
                    to_token: base.symbol.clone(),
                    buy_venue: buy_venue.name.clone(),
                    sell_venue: sell_venue.name.clone(),
                    buy_price,
                    sell_price,
                    profit_percent,
                    estimated_profit: constraints.estimated_profit(profit_percent),
                    risk_level: RiskLevel::from_profit(profit_percent),
                    estimated_execution_ms: 2 * ESTIMATED_MS_PER_HOP,
                    timestamp: now,
                }));
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::test_support::*;
    use crate::random::SequenceRandom;

    fn two_venue_table(
        a: (Decimal, Decimal),
        b: (Decimal, Decimal),
    ) -> RateTable {
        let mut table = RateTable::new(vec![free_venue("A"), free_venue("B")]);
        table.insert_quote("SOL", "A", a.0, a.1);
        table.insert_quote("SOL", "B", b.0, b.1);
        table.insert_quote("USDC", "A", dec!(1), dec!(1));
        table.insert_quote("USDC", "B", dec!(1), dec!(1));
        table
    }

    fn run(table: &RateTable, threshold: Decimal) -> Vec<Opportunity> {
        let prices = [("SOL", dec!(120)), ("USDC", dec!(1))];
        let constraints = FinderConstraints {
            min_profit_threshold: threshold,
            ..FinderConstraints::default()
        };
        SimpleFinder.find(
            &snapshot(&prices),
            table,
            &tokens(&prices),
            &constraints,
            &mut SequenceRandom::constant(0.0),
        )
    }

    #[test]
    fn finds_cross_venue_spread() {
        let table = two_venue_table((dec!(119), dec!(120)), (dec!(121.8), dec!(122)));
        let found = run(&table, dec!(0.5));
        assert_eq!(found.len(), 1);

        let Opportunity::Simple(opp) = &found[0] else {
            panic!("expected a simple opportunity");
        };
        assert_eq!(opp.from_token, "USDC");
        assert_eq!(opp.to_token, "SOL");
        assert_eq!(opp.buy_venue, "A");
        assert_eq!(opp.sell_venue, "B");
        assert_eq!(opp.profit_percent, dec!(1.5));
        assert_eq!(opp.estimated_profit, dec!(1.5));
        assert_eq!(opp.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let table = two_venue_table((dec!(99), dec!(100)), (dec!(100.5), dec!(101)));
        assert_eq!(run(&table, dec!(0.5)).len(), 1);
        assert!(run(&table, dec!(0.51)).is_empty());
    }

    #[test]
    fn same_venue_best_on_both_sides_is_ignored() {
        let table = two_venue_table((dec!(121.8), dec!(120)), (dec!(119), dec!(122)));
        assert!(run(&table, Decimal::ZERO).is_empty());
    }

    #[test]
    fn fees_and_gas_eat_the_spread() {
        let venues = vec![
            Venue::new("A", "A", dec!(0.003), dec!(0.12), 5),
            Venue::new("B", "B", dec!(0.003), dec!(0.12), 5),
        ];
        let mut table = RateTable::new(venues);
        table.insert_quote("SOL", "A", dec!(119), dec!(120));
        table.insert_quote("SOL", "B", dec!(121.8), dec!(122));
        table.insert_quote("USDC", "A", dec!(1), dec!(1));
        table.insert_quote("USDC", "B", dec!(1), dec!(1));

        let found = run(&table, Decimal::ZERO);
        let Opportunity::Simple(opp) = &found[0] else {
            panic!("expected a simple opportunity");
        };
        assert_eq!(opp.buy_price, dec!(120.48));
        assert_eq!(opp.sell_price, dec!(121.3146));
        assert!(opp.profit_percent < dec!(1.5));
        assert!(run(&table, dec!(1.0)).is_empty());
    }

    #[test]
    fn unpriced_tokens_are_skipped() {
        let table = two_venue_table((dec!(119), dec!(120)), (dec!(121.8), dec!(122)));
        let prices = [("SOL", dec!(120)), ("USDC", Decimal::ZERO)];
        let found = SimpleFinder.find(
            &snapshot(&prices),
            &table,
            &tokens(&prices),
            &FinderConstraints::default(),
            &mut SequenceRandom::constant(0.0),
        );
        assert!(found.is_empty());
    }
}
