//! Console rendering of feed snapshots, trades and session statistics

use std::time::Instant;
use tracing::{error, info, warn};
use crate::{
    config::Config,
    types::{ExecutionStats, GasStatus, Opportunity, OpportunityKind, OpportunitySet, PriceSnapshot, TradeOutcome},
};

pub fn print_configuration(config: &Config) {
    info!("📋 Configuration:");
    info!("   Risk Profile: {}", config.risk_profile);
    info!("   Min Profit: {}%", config.min_profit_threshold);
    info!("   Complex Min Profit: {}%", config.complex_min_profit_threshold);
    info!("   Max Transaction Size: {}", config.max_transaction_size);
    info!("   Tick Interval: {}ms", config.tick_interval_ms);
    info!("   Price TTL: {}ms", config.price_ttl_ms);
    info!("   Auto Execute: {}", config.auto_execute);
    info!("   Max Concurrent Trades: {}", config.max_concurrent_trades);
    info!("   Gas Refresh: {}ms (limit {} Gwei)", config.gas_refresh_interval_ms, config.gas_limit);
    info!("   Upstream Prices: {}", config.enable_upstream_prices);
    info!("   Upstream Rates: {}", config.enable_upstream_rates);
    if let Some(seed) = config.random_seed {
        info!("   Random Seed: {}", seed);
    }
}

pub fn print_prices(snapshot: &PriceSnapshot) {
    info!("💱 Prices ({} tokens)", snapshot.len());
    for quote in snapshot.quotes.values() {
        info!(
            "   {:<5} ${:>12.4}  {:>+6.2}%  ({:?})",
            quote.token, quote.price, quote.change_24h, quote.source
        );
    }
}

pub fn print_gas_status(status: &GasStatus) {
    info!(
        "⛽ Gas {} Gwei (avg {} over {} samples), congestion {}",
        status.current_price, status.average_price.round_dp(4), status.samples, status.congestion
    );
}

fn print_bucket(kind: OpportunityKind, bucket: &[Opportunity]) {
    if bucket.is_empty() {
        return;
    }
    warn!("   {} ({}):", kind, bucket.len());
    for opp in bucket {
        warn!(
            "     {:>6.3}%  ~{:.4}  {:?} risk  {}",
            opp.profit_percent(),
            opp.estimated_profit(),
            opp.risk_level(),
            opp.route_label()
        );
    }
}

pub fn print_opportunity_set(set: &OpportunitySet) {
    if set.is_empty() {
        info!("🔍 No opportunities found");
        return;
    }
    warn!("\n🎯 {} ARBITRAGE OPPORTUNITIES", set.len());
    print_bucket(OpportunityKind::Simple, &set.simple);
    print_bucket(OpportunityKind::Triangular, &set.triangular);
    print_bucket(OpportunityKind::Complex, &set.complex);
}

pub fn print_trade_outcome(outcome: &TradeOutcome) {
    if outcome.success {
        warn!("\n✅ TRADE EXECUTION #{}", outcome.id);
        warn!("   Route: {}", outcome.route);
        warn!("   Position: {}", outcome.position_size);
        warn!("   Realized P&L: {:+.4}", outcome.realized_pnl);
        warn!("   Execution Time: {}ms", outcome.execution_time_ms);
    } else {
        error!("\n❌ TRADE EXECUTION FAILED #{}", outcome.id);
        error!("   Route: {}", outcome.route);
        if let Some(kind) = outcome.failure {
            error!("   Kind: {}", kind);
        }
        error!("   Reason: {}", outcome.reason.as_deref().unwrap_or("Unknown"));
        if !outcome.realized_pnl.is_zero() {
            error!("   Realized P&L: {:+.4}", outcome.realized_pnl);
        }
    }
}

pub fn print_session_stats(start_time: Instant, published_ticks: u64, stats: &ExecutionStats) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 FEED:");
    info!("     Ticks with opportunities: {}", published_ticks);
    info!("   🚀 TRADE EXECUTION:");
    info!("     Total: {}", stats.total);
    info!("     Successful: {}", stats.successful);
    info!("     Failed: {} ({} timed out)", stats.failed, stats.timed_out);
    info!("     Rejected: {}", stats.rejected);
    info!("     Success rate: {:.1}%", stats.success_rate() * 100.0);
    info!("     Realized P&L: {:+.4}", stats.realized_pnl);
    info!("     Avg execution time: {}ms", stats.average_execution_ms());
    info!("");
}
