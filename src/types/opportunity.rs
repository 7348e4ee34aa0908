//! Arbitrage opportunity types

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Simple,
    Triangular,
    Complex,
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpportunityKind::Simple => write!(f, "simple"),
            OpportunityKind::Triangular => write!(f, "triangular"),
            OpportunityKind::Complex => write!(f, "complex"),
        }
    }
}

impl OpportunityKind {
    /// Minimum profit an opportunity of this kind must clear. Complex paths take the
    /// stricter of the two thresholds.
    pub fn min_profit(self, min_profit: Decimal, complex_min_profit: Decimal) -> Decimal {
        match self {
            OpportunityKind::Complex => min_profit.max(complex_min_profit),
            _ => min_profit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Wider fabricated spreads are treated as riskier.
    pub fn from_profit(profit_percent: Decimal) -> Self {
        match profit_percent {
            p if p < dec!(1) => RiskLevel::Low,
            p if p < dec!(2) => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Medium,
    High,
}

impl Complexity {
    pub fn from_hops(hops: usize) -> Self {
        if hops <= 4 { Complexity::Medium } else { Complexity::High }
    }
}

/// One conversion step: sell `from`, receive `rate` units of `to` on `venue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hop {
    pub from: String,
    pub to: String,
    pub venue: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleOpportunity {
    pub id: String,
    pub from_token: String,
    pub to_token: String,
    pub buy_venue: String,
    pub sell_venue: String,
    /// Effective buy price of `to_token` in `from_token`, fees and gas included.
    pub buy_price: Decimal,
    /// Effective sell price of `to_token` in `from_token`, fees and gas deducted.
    pub sell_price: Decimal,
    pub profit_percent: Decimal,
    pub estimated_profit: Decimal,
    pub risk_level: RiskLevel,
    pub estimated_execution_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriangularOpportunity {
    pub id: String,
    pub base_token: String,
    pub route: Vec<Hop>,
    pub fee_factor: Decimal,
    pub profit_percent: Decimal,
    pub estimated_profit: Decimal,
    pub risk_level: RiskLevel,
    pub estimated_execution_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexOpportunity {
    pub id: String,
    pub path: Vec<Hop>,
    pub fee_factor: Decimal,
    pub profit_percent: Decimal,
    pub estimated_profit: Decimal,
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
    pub estimated_execution_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Opportunity {
    Simple(SimpleOpportunity),
    Triangular(TriangularOpportunity),
    Complex(ComplexOpportunity),
}

impl Opportunity {
    pub fn id(&self) -> &str {
        match self {
            Opportunity::Simple(o) => &o.id,
            Opportunity::Triangular(o) => &o.id,
            Opportunity::Complex(o) => &o.id,
        }
    }

    pub fn kind(&self) -> OpportunityKind {
        match self {
            Opportunity::Simple(_) => OpportunityKind::Simple,
            Opportunity::Triangular(_) => OpportunityKind::Triangular,
            Opportunity::Complex(_) => OpportunityKind::Complex,
        }
    }

    pub fn profit_percent(&self) -> Decimal {
        match self {
            Opportunity::Simple(o) => o.profit_percent,
            Opportunity::Triangular(o) => o.profit_percent,
            Opportunity::Complex(o) => o.profit_percent,
        }
    }

    pub fn estimated_profit(&self) -> Decimal {
        match self {
            Opportunity::Simple(o) => o.estimated_profit,
            Opportunity::Triangular(o) => o.estimated_profit,
            Opportunity::Complex(o) => o.estimated_profit,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Opportunity::Simple(o) => o.timestamp,
            Opportunity::Triangular(o) => o.timestamp,
            Opportunity::Complex(o) => o.timestamp,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Opportunity::Simple(o) => o.risk_level,
            Opportunity::Triangular(o) => o.risk_level,
            Opportunity::Complex(o) => o.risk_level,
        }
    }

    pub fn estimated_execution_ms(&self) -> u64 {
        match self {
            Opportunity::Simple(o) => o.estimated_execution_ms,
            Opportunity::Triangular(o) => o.estimated_execution_ms,
            Opportunity::Complex(o) => o.estimated_execution_ms,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp()
    }

    /// Human-readable route, e.g. `USDC → SOL (Jupiter → Raydium)`.
    pub fn route_label(&self) -> String {
        match self {
            Opportunity::Simple(o) => format!(
                "{} → {} ({} → {})",
                o.from_token, o.to_token, o.buy_venue, o.sell_venue
            ),
            Opportunity::Triangular(o) => hops_label(&o.route),
            Opportunity::Complex(o) => hops_label(&o.path),
        }
    }
}

fn hops_label(hops: &[Hop]) -> String {
    let Some(first) = hops.first() else {
        return String::new();
    };
    let mut tokens = vec![first.from.as_str()];
    tokens.extend(hops.iter().map(|h| h.to.as_str()));
    let venues: Vec<&str> = hops.iter().map(|h| h.venue.as_str()).collect();
    format!("{} ({})", tokens.join(" → "), venues.join(" → "))
}

/// One published feed snapshot. Buckets are sorted by descending profit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunitySet {
    pub simple: Vec<Opportunity>,
    pub triangular: Vec<Opportunity>,
    pub complex: Vec<Opportunity>,
    pub timestamp: DateTime<Utc>,
}

impl OpportunitySet {
    pub fn empty() -> Self {
        Self {
            simple: Vec::new(),
            triangular: Vec::new(),
            complex: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.triangular.is_empty() && self.complex.is_empty()
    }

    pub fn len(&self) -> usize {
        self.simple.len() + self.triangular.len() + self.complex.len()
    }

    pub fn bucket(&self, kind: OpportunityKind) -> &[Opportunity] {
        match kind {
            OpportunityKind::Simple => &self.simple,
            OpportunityKind::Triangular => &self.triangular,
            OpportunityKind::Complex => &self.complex,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opportunity> {
        self.simple
            .iter()
            .chain(self.triangular.iter())
            .chain(self.complex.iter())
    }

    /// Most profitable opportunity across all buckets.
    pub fn best(&self) -> Option<&Opportunity> {
        self.iter().max_by_key(|o| o.profit_percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(from: &str, to: &str, venue: &str) -> Hop {
        Hop {
            from: from.to_string(),
            to: to.to_string(),
            venue: venue.to_string(),
            rate: dec!(1),
        }
    }

    #[test]
    fn risk_level_bands() {
        assert_eq!(RiskLevel::from_profit(dec!(0.5)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_profit(dec!(1.0)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_profit(dec!(1.99)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_profit(dec!(3.4)), RiskLevel::High);
    }

    #[test]
    fn complex_kind_uses_stricter_threshold() {
        assert_eq!(OpportunityKind::Simple.min_profit(dec!(0.5), dec!(1.0)), dec!(0.5));
        assert_eq!(OpportunityKind::Triangular.min_profit(dec!(0.5), dec!(1.0)), dec!(0.5));
        assert_eq!(OpportunityKind::Complex.min_profit(dec!(0.5), dec!(1.0)), dec!(1.0));
        assert_eq!(OpportunityKind::Complex.min_profit(dec!(1.5), dec!(1.0)), dec!(1.5));
    }

    #[test]
    fn complexity_follows_hop_count() {
        assert_eq!(Complexity::from_hops(4), Complexity::Medium);
        assert_eq!(Complexity::from_hops(5), Complexity::High);
        assert_eq!(Complexity::from_hops(6), Complexity::High);
    }

    #[test]
    fn route_label_lists_tokens_and_venues() {
        let opp = Opportunity::Triangular(TriangularOpportunity {
            id: "tri".to_string(),
            base_token: "USDC".to_string(),
            route: vec![
                hop("USDC", "SOL", "Jupiter"),
                hop("SOL", "BTC", "Raydium"),
                hop("BTC", "USDC", "Orca"),
            ],
            fee_factor: dec!(0.991),
            profit_percent: dec!(1.78),
            estimated_profit: dec!(1.78),
            risk_level: RiskLevel::Medium,
            estimated_execution_ms: 500,
            timestamp: Utc::now(),
        });
        assert_eq!(
            opp.route_label(),
            "USDC → SOL → BTC → USDC (Jupiter → Raydium → Orca)"
        );
        assert_eq!(opp.kind(), OpportunityKind::Triangular);
    }

    #[test]
    fn serializes_with_type_tag() {
        let opp = Opportunity::Complex(ComplexOpportunity {
            id: "cx".to_string(),
            path: vec![
                hop("SOL", "ETH", "Orca"),
                hop("ETH", "BTC", "Orca"),
                hop("BTC", "JUP", "Orca"),
                hop("JUP", "SOL", "Orca"),
            ],
            fee_factor: dec!(0.99),
            profit_percent: dec!(1.2),
            estimated_profit: dec!(1.2),
            complexity: Complexity::Medium,
            risk_level: RiskLevel::Medium,
            estimated_execution_ms: 1500,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&opp).unwrap();
        assert_eq!(json["type"], "complex");
        assert_eq!(json["complexity"], "medium");
    }

    #[test]
    fn empty_set_has_no_best() {
        let set = OpportunitySet::empty();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.best().is_none());
    }
}
