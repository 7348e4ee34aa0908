//! Trade execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::OpportunityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    /// Probability that a simulated trade settles successfully.
    pub fn success_probability(&self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.85,
            RiskProfile::Moderate => 0.75,
            RiskProfile::Aggressive => 0.65,
        }
    }

    /// Share of the position range the profile is willing to use.
    pub fn position_factor(&self) -> Decimal {
        match self {
            RiskProfile::Conservative => dec!(0.3),
            RiskProfile::Moderate => dec!(0.6),
            RiskProfile::Aggressive => dec!(0.9),
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskProfile::Conservative => write!(f, "conservative"),
            RiskProfile::Moderate => write!(f, "moderate"),
            RiskProfile::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(format!("unknown risk profile: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StaleOpportunity,
    BelowThreshold,
    GasLimitExceeded,
    SimulatedExecutionFailure,
    Timeout,
    ConcurrencyLimit,
}

impl FailureKind {
    /// Validation failures never reached the simulated market.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FailureKind::StaleOpportunity
                | FailureKind::BelowThreshold
                | FailureKind::GasLimitExceeded
                | FailureKind::ConcurrencyLimit
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::StaleOpportunity => write!(f, "stale opportunity"),
            FailureKind::BelowThreshold => write!(f, "below threshold"),
            FailureKind::GasLimitExceeded => write!(f, "gas limit exceeded"),
            FailureKind::SimulatedExecutionFailure => write!(f, "execution failure"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConcurrencyLimit => write!(f, "concurrency limit"),
        }
    }
}

/// Immutable record of one simulated execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOutcome {
    pub id: String,
    pub opportunity_id: String,
    pub opportunity_kind: OpportunityKind,
    pub route: String,
    pub success: bool,
    pub realized_pnl: Decimal,
    pub position_size: Decimal,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub failure: Option<FailureKind>,
    pub reason: Option<String>,
}

impl TradeOutcome {
    pub fn is_rejection(&self) -> bool {
        self.failure.is_some_and(|f| f.is_rejection())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub realized_pnl: Decimal,
    pub total_execution_ms: u64,
}

impl ExecutionStats {
    pub fn record(&mut self, outcome: &TradeOutcome) {
        self.total += 1;
        self.realized_pnl += outcome.realized_pnl;
        self.total_execution_ms += outcome.execution_time_ms;
        match outcome.failure {
            None => self.successful += 1,
            Some(FailureKind::Timeout) => {
                self.failed += 1;
                self.timed_out += 1;
            }
            Some(kind) if kind.is_rejection() => self.rejected += 1,
            Some(_) => self.failed += 1,
        }
    }

    /// Successful share of trades that reached the simulated market.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.successful + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        self.successful as f64 / attempted as f64
    }

    pub fn average_execution_ms(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        self.total_execution_ms / self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(failure: Option<FailureKind>, pnl: Decimal, ms: u64) -> TradeOutcome {
        TradeOutcome {
            id: "t".to_string(),
            opportunity_id: "o".to_string(),
            opportunity_kind: OpportunityKind::Simple,
            route: "USDC → SOL".to_string(),
            success: failure.is_none(),
            realized_pnl: pnl,
            position_size: dec!(5),
            execution_time_ms: ms,
            timestamp: Utc::now(),
            failure,
            reason: None,
        }
    }

    #[test]
    fn risk_profile_parses_case_insensitively() {
        assert_eq!("Aggressive".parse::<RiskProfile>(), Ok(RiskProfile::Aggressive));
        assert_eq!(" moderate ".parse::<RiskProfile>(), Ok(RiskProfile::Moderate));
        assert!("reckless".parse::<RiskProfile>().is_err());
        assert_eq!(RiskProfile::Conservative.to_string(), "conservative");
    }

    #[test]
    fn stats_separate_rejections_from_failures() {
        let mut stats = ExecutionStats::default();
        stats.record(&outcome(None, dec!(1.5), 400));
        stats.record(&outcome(Some(FailureKind::SimulatedExecutionFailure), dec!(-0.05), 600));
        stats.record(&outcome(Some(FailureKind::StaleOpportunity), Decimal::ZERO, 0));
        stats.record(&outcome(Some(FailureKind::Timeout), Decimal::ZERO, 1000));

        assert_eq!(stats.total, 4);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.realized_pnl, dec!(1.45));
        assert_eq!(stats.average_execution_ms(), 500);
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < 1e-9);
    }
}
