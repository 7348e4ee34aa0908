//! Trade execution simulation

use chrono::{TimeDelta, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};
use crate::{
    config::Config,
    events::{EngineEvent, EventBus},
    gas::GasTracker,
    random::SharedRandom,
    storage::{save_trade_outcome, BoundedLog},
    types::{ExecutionStats, FailureKind, Opportunity, OpportunityKind, RiskProfile, TradeOutcome},
};

/// Fixed loss booked for a simulated market failure, in the reference currency.
pub const FAILURE_LOSS: Decimal = dec!(0.05);
/// Maximum relative deviation of realized profit from the expected profit.
pub const PROFIT_VARIANCE: f64 = 0.15;

const FAILURE_REASONS: [&str; 4] = [
    "Insufficient liquidity",
    "Price slippage too high",
    "Blockchain congestion",
    "Transaction reverted",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPolicy {
    pub risk_profile: RiskProfile,
    pub min_profit_threshold: Decimal,
    pub complex_min_profit_threshold: Decimal,
    pub max_transaction_size: Decimal,
    /// Highest gas price, in Gwei, a trade may be submitted at.
    pub gas_limit: Decimal,
    pub max_opportunity_age_secs: u64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub execution_timeout: Duration,
}

impl ExecutionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            risk_profile: config.risk_profile,
            min_profit_threshold: config.min_profit_threshold,
            complex_min_profit_threshold: config.complex_min_profit_threshold,
            max_transaction_size: config.max_transaction_size,
            gas_limit: Decimal::from(config.gas_limit),
            max_opportunity_age_secs: config.max_opportunity_age_secs,
            min_latency_ms: config.min_latency_ms,
            max_latency_ms: config.max_latency_ms,
            execution_timeout: config.execution_timeout(),
        }
    }

    pub fn threshold_for(&self, kind: OpportunityKind) -> Decimal {
        kind.min_profit(self.min_profit_threshold, self.complex_min_profit_threshold)
    }

    /// Scales between a small floor and `max_transaction_size` with profit and appetite.
    pub fn position_size(&self, profit_percent: Decimal) -> Decimal {
        let max = self.max_transaction_size.max(Decimal::ZERO);
        let min = Decimal::ONE.min(max * dec!(0.1));
        let profit_factor = profit_percent.max(Decimal::ZERO) / dec!(5);
        let size = min + (max - min) * profit_factor * self.risk_profile.position_factor();
        size.min(max).round_dp(6)
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Pre-drawn randomness for one trade, so no lock is held while the trade sleeps.
struct TradeDraw {
    latency_ms: u64,
    success: bool,
    variance: f64,
    reason: &'static str,
}

/// Probabilistic stand-in for an execution engine. Never retries.
pub struct ExecutionSimulator {
    policy: RwLock<ExecutionPolicy>,
    random: SharedRandom,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    history: RwLock<BoundedLog<TradeOutcome>>,
    stats: RwLock<ExecutionStats>,
    events: EventBus,
    gas: Option<Arc<GasTracker>>,
    output_dir: Option<PathBuf>,
}

impl ExecutionSimulator {
    pub fn new(
        policy: ExecutionPolicy,
        max_concurrent: usize,
        history_capacity: usize,
        random: SharedRandom,
        events: EventBus,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            policy: RwLock::new(policy),
            random,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            history: RwLock::new(BoundedLog::new(history_capacity)),
            stats: RwLock::new(ExecutionStats::default()),
            events,
            gas: None,
            output_dir: None,
        }
    }

    /// Rejects trades while the tracked gas price is above the policy's gas limit.
    pub fn with_gas_tracker(mut self, gas: Arc<GasTracker>) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Appends every outcome to a daily JSONL file under `dir`.
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub async fn policy(&self) -> ExecutionPolicy {
        self.policy.read().await.clone()
    }

    pub async fn update_policy(&self, policy: ExecutionPolicy) {
        *self.policy.write().await = policy;
    }

    /// Trades currently sleeping in simulated latency.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub async fn execute(&self, opportunity: &Opportunity) -> TradeOutcome {
        let timeout = self.policy.read().await.execution_timeout;
        self.execute_with_timeout(opportunity, timeout).await
    }

    /// Like `execute`, but a trade still pending after `timeout` resolves as `FailureKind::Timeout`.
    pub async fn execute_with_timeout(&self, opportunity: &Opportunity, timeout: Duration) -> TradeOutcome {
        let policy = self.policy().await;
        let gas_price = match &self.gas {
            Some(gas) => gas.current_price().await,
            None => None,
        };

        if let Some((kind, reason)) = validate(opportunity, &policy, gas_price) {
            warn!(opportunity_id = %opportunity.id(), "Trade rejected: {}", reason);
            return self.record(rejected(opportunity, kind, reason)).await;
        }

        let Ok(_permit) = self.permits.clone().try_acquire_owned() else {
            let reason = format!("{} trades already in flight", self.max_concurrent);
            warn!(opportunity_id = %opportunity.id(), "Trade rejected: {}", reason);
            return self
                .record(rejected(opportunity, FailureKind::ConcurrencyLimit, reason))
                .await;
        };

        let draw = self.random.with(|rng| {
            let latency = rng.range(policy.min_latency_ms as f64, policy.max_latency_ms as f64 + 1.0);
            TradeDraw {
                latency_ms: (latency as u64).min(policy.max_latency_ms),
                success: rng.chance(policy.risk_profile.success_probability()),
                variance: rng.range(-PROFIT_VARIANCE, PROFIT_VARIANCE),
                reason: FAILURE_REASONS[rng.index(FAILURE_REASONS.len())],
            }
        });

        info!(
            opportunity_id = %opportunity.id(),
            kind = %opportunity.kind(),
            profit = %opportunity.profit_percent(),
            latency_ms = draw.latency_ms,
            "🚀 Simulating trade execution"
        );

        let latency = Duration::from_millis(draw.latency_ms);
        let settled = draw.latency_ms == 0
            || tokio::time::timeout(timeout, tokio::time::sleep(latency)).await.is_ok();

        let position_size = policy.position_size(opportunity.profit_percent());
        let outcome = if !settled {
            TradeOutcome {
                execution_time_ms: timeout.as_millis() as u64,
                failure: Some(FailureKind::Timeout),
                reason: Some(format!("Execution timed out after {}ms", timeout.as_millis())),
                position_size,
                ..base_outcome(opportunity)
            }
        } else if draw.success {
            let expected = position_size * opportunity.profit_percent() / dec!(100);
            let variance = Decimal::from_f64(draw.variance).unwrap_or(Decimal::ZERO);
            TradeOutcome {
                success: true,
                realized_pnl: (expected * (Decimal::ONE + variance)).round_dp(6),
                position_size,
                execution_time_ms: draw.latency_ms,
                ..base_outcome(opportunity)
            }
        } else {
            TradeOutcome {
                realized_pnl: -FAILURE_LOSS,
                position_size,
                execution_time_ms: draw.latency_ms,
                failure: Some(FailureKind::SimulatedExecutionFailure),
                reason: Some(draw.reason.to_string()),
                ..base_outcome(opportunity)
            }
        };

        info!(
            "🎭 Simulated execution: success={}, pnl={}, time={}ms",
            outcome.success, outcome.realized_pnl, outcome.execution_time_ms
        );
        self.record(outcome).await
    }

    async fn record(&self, outcome: TradeOutcome) -> TradeOutcome {
        self.history.write().await.push(outcome.clone());
        self.stats.write().await.record(&outcome);

        if let Some(dir) = &self.output_dir {
            if let Err(e) = save_trade_outcome(dir, &outcome) {
                warn!("⚠️ Failed to save trade outcome: {}", e);
            }
        }
        self.events.publish(EngineEvent::TradeExecuted(outcome.clone()));
        outcome
    }

    /// Recorded outcomes, oldest first.
    pub async fn history(&self) -> Vec<TradeOutcome> {
        self.history.read().await.to_vec()
    }

    pub async fn stats(&self) -> ExecutionStats {
        self.stats.read().await.clone()
    }
}

/// Deterministic pre-trade checks. `None` means the trade may proceed.
fn validate(
    opportunity: &Opportunity,
    policy: &ExecutionPolicy,
    gas_price: Option<Decimal>,
) -> Option<(FailureKind, String)> {
    let age = opportunity.age(Utc::now());
    let max_age = TimeDelta::seconds(policy.max_opportunity_age_secs as i64);
    if age > max_age {
        return Some((
            FailureKind::StaleOpportunity,
            format!(
                "Opportunity expired ({}s old, max {}s)",
                age.num_seconds(),
                policy.max_opportunity_age_secs
            ),
        ));
    }
    let threshold = policy.threshold_for(opportunity.kind());
    if opportunity.profit_percent() < threshold {
        return Some((
            FailureKind::BelowThreshold,
            format!(
                "Profit {}% below threshold {}%",
                opportunity.profit_percent().round_dp(4),
                threshold
            ),
        ));
    }
    if let Some(price) = gas_price.filter(|p| *p > policy.gas_limit) {
        return Some((
            FailureKind::GasLimitExceeded,
            format!("Gas price {} Gwei above limit {} Gwei", price, policy.gas_limit),
        ));
    }
    None
}

fn base_outcome(opportunity: &Opportunity) -> TradeOutcome {
    TradeOutcome {
        id: uuid::Uuid::new_v4().to_string(),
        opportunity_id: opportunity.id().to_string(),
        opportunity_kind: opportunity.kind(),
        route: opportunity.route_label(),
        success: false,
        realized_pnl: Decimal::ZERO,
        position_size: Decimal::ZERO,
        execution_time_ms: 0,
        timestamp: Utc::now(),
        failure: None,
        reason: None,
    }
}

fn rejected(opportunity: &Opportunity, kind: FailureKind, reason: String) -> TradeOutcome {
    TradeOutcome {
        failure: Some(kind),
        reason: Some(reason),
        ..base_outcome(opportunity)
    }
}
