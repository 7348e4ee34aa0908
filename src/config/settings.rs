//! Simulation configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    errors::{SimError, SimResult},
    storage::UserSettings,
    types::RiskProfile,
};

// Detection constants
pub const DEFAULT_MIN_PROFIT_THRESHOLD_PCT: Decimal = dec!(0.5);
pub const DEFAULT_COMPLEX_MIN_PROFIT_THRESHOLD_PCT: Decimal = dec!(1.0);
pub const DEFAULT_TRADE_SIZE_USD: Decimal = dec!(100);
pub const DEFAULT_MAX_OPPORTUNITIES_PER_BUCKET: usize = 5;
pub const DEFAULT_VENUE_SAMPLE_SIZE: usize = 5;
pub const DEFAULT_TRIANGLE_SAMPLES_PER_BASE: usize = 6;
pub const DEFAULT_COMPLEX_PATHS_PER_TICK: usize = 3;
pub const DEFAULT_RATE_JITTER_PCT: f64 = 1.5;
pub const MAX_RATE_JITTER_PCT: f64 = 10.0;

// Timer constants
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_PRICE_TTL_MS: u64 = 10_000;
pub const DEFAULT_PRICE_REFRESH_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_GAS_REFRESH_INTERVAL_MS: u64 = 120_000;

// Trade execution constants
pub const DEFAULT_MAX_TRANSACTION_SIZE: Decimal = dec!(15);
pub const DEFAULT_MAX_CONCURRENT_TRADES: usize = 3;
pub const DEFAULT_MAX_OPPORTUNITY_AGE_SECS: u64 = 60;
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MIN_LATENCY_MS: u64 = 200;
pub const DEFAULT_MAX_LATENCY_MS: u64 = 2_000;
pub const DEFAULT_GAS_LIMIT: u32 = 35;

// Persistence constants
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;
pub const DEFAULT_UPSTREAM_PRICE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_UPSTREAM_QUOTE_URL: &str = "https://quote-api.jup.ag/v6";

#[derive(Debug, Clone)]
pub struct Config {
    // Detection
    pub min_profit_threshold: Decimal,
    pub complex_min_profit_threshold: Decimal,
    pub trade_size_usd: Decimal,
    pub max_opportunities_per_bucket: usize,
    pub venue_sample_size: usize,
    pub triangle_samples_per_base: usize,
    pub complex_paths_per_tick: usize,
    pub rate_jitter_pct: f64,
    // Timers
    pub tick_interval_ms: u64,
    pub price_ttl_ms: u64,
    pub price_refresh_interval_ms: u64,
    pub gas_refresh_interval_ms: u64,
    // Execution
    pub risk_profile: RiskProfile,
    pub max_transaction_size: Decimal,
    pub auto_execute: bool,
    pub max_concurrent_trades: usize,
    pub max_opportunity_age_secs: u64,
    pub execution_timeout_ms: u64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub gas_limit: u32,
    // Upstream prices
    pub enable_upstream_prices: bool,
    pub upstream_price_url: String,
    pub enable_upstream_rates: bool,
    pub upstream_quote_url: String,
    // Persistence
    pub history_capacity: usize,
    pub output_dir: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub random_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_profit_threshold: DEFAULT_MIN_PROFIT_THRESHOLD_PCT,
            complex_min_profit_threshold: DEFAULT_COMPLEX_MIN_PROFIT_THRESHOLD_PCT,
            trade_size_usd: DEFAULT_TRADE_SIZE_USD,
            max_opportunities_per_bucket: DEFAULT_MAX_OPPORTUNITIES_PER_BUCKET,
            venue_sample_size: DEFAULT_VENUE_SAMPLE_SIZE,
            triangle_samples_per_base: DEFAULT_TRIANGLE_SAMPLES_PER_BASE,
            complex_paths_per_tick: DEFAULT_COMPLEX_PATHS_PER_TICK,
            rate_jitter_pct: DEFAULT_RATE_JITTER_PCT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            price_ttl_ms: DEFAULT_PRICE_TTL_MS,
            price_refresh_interval_ms: DEFAULT_PRICE_REFRESH_INTERVAL_MS,
            gas_refresh_interval_ms: DEFAULT_GAS_REFRESH_INTERVAL_MS,
            risk_profile: RiskProfile::Moderate,
            max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
            auto_execute: false,
            max_concurrent_trades: DEFAULT_MAX_CONCURRENT_TRADES,
            max_opportunity_age_secs: DEFAULT_MAX_OPPORTUNITY_AGE_SECS,
            execution_timeout_ms: DEFAULT_EXECUTION_TIMEOUT_MS,
            min_latency_ms: DEFAULT_MIN_LATENCY_MS,
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
            gas_limit: DEFAULT_GAS_LIMIT,
            enable_upstream_prices: false,
            upstream_price_url: DEFAULT_UPSTREAM_PRICE_URL.to_string(),
            enable_upstream_rates: false,
            upstream_quote_url: DEFAULT_UPSTREAM_QUOTE_URL.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            output_dir: None,
            settings_path: None,
            random_seed: None,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unparseable values fall back to defaults;
    /// out-of-range values are clamped.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let decimal = |key: &str| lookup(key).and_then(|s| Decimal::from_str(s.trim()).ok());
        let integer = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let flag = |key: &str| lookup(key).and_then(|s| s.trim().parse::<bool>().ok());

        Self {
            min_profit_threshold: decimal("MIN_PROFIT_THRESHOLD")
                .unwrap_or(defaults.min_profit_threshold),
            complex_min_profit_threshold: decimal("COMPLEX_MIN_PROFIT_THRESHOLD")
                .unwrap_or(defaults.complex_min_profit_threshold),
            trade_size_usd: decimal("TRADE_SIZE_USD").unwrap_or(defaults.trade_size_usd),
            max_opportunities_per_bucket: integer("MAX_OPPORTUNITIES_PER_BUCKET")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_opportunities_per_bucket),
            venue_sample_size: integer("VENUE_SAMPLE_SIZE")
                .map(|v| v as usize)
                .unwrap_or(defaults.venue_sample_size)
                .max(2),
            triangle_samples_per_base: integer("TRIANGLE_SAMPLES_PER_BASE")
                .map(|v| v as usize)
                .unwrap_or(defaults.triangle_samples_per_base),
            complex_paths_per_tick: integer("COMPLEX_PATHS_PER_TICK")
                .map(|v| v as usize)
                .unwrap_or(defaults.complex_paths_per_tick),
            rate_jitter_pct: lookup("RATE_JITTER_PCT")
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(defaults.rate_jitter_pct)
                .clamp(0.0, MAX_RATE_JITTER_PCT),
            tick_interval_ms: integer("TICK_INTERVAL_MS").unwrap_or(defaults.tick_interval_ms),
            price_ttl_ms: integer("PRICE_TTL_MS").unwrap_or(defaults.price_ttl_ms),
            price_refresh_interval_ms: integer("PRICE_REFRESH_INTERVAL_MS")
                .unwrap_or(defaults.price_refresh_interval_ms),
            gas_refresh_interval_ms: integer("GAS_REFRESH_INTERVAL_MS")
                .unwrap_or(defaults.gas_refresh_interval_ms),
            risk_profile: lookup("RISK_PROFILE")
                .and_then(|s| RiskProfile::from_str(&s).ok())
                .unwrap_or(defaults.risk_profile),
            max_transaction_size: decimal("MAX_TRANSACTION_SIZE")
                .unwrap_or(defaults.max_transaction_size),
            auto_execute: flag("AUTO_EXECUTE").unwrap_or(defaults.auto_execute),
            max_concurrent_trades: integer("MAX_CONCURRENT_TRADES")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_concurrent_trades),
            max_opportunity_age_secs: integer("MAX_OPPORTUNITY_AGE_SECS")
                .unwrap_or(defaults.max_opportunity_age_secs),
            execution_timeout_ms: integer("EXECUTION_TIMEOUT_MS")
                .unwrap_or(defaults.execution_timeout_ms),
            min_latency_ms: integer("MIN_LATENCY_MS").unwrap_or(defaults.min_latency_ms),
            max_latency_ms: integer("MAX_LATENCY_MS").unwrap_or(defaults.max_latency_ms),
            gas_limit: integer("GAS_LIMIT")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.gas_limit),
            enable_upstream_prices: flag("ENABLE_UPSTREAM_PRICES")
                .unwrap_or(defaults.enable_upstream_prices),
            upstream_price_url: lookup("UPSTREAM_PRICE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.upstream_price_url),
            enable_upstream_rates: flag("ENABLE_UPSTREAM_RATES")
                .unwrap_or(defaults.enable_upstream_rates),
            upstream_quote_url: lookup("UPSTREAM_QUOTE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.upstream_quote_url),
            history_capacity: integer("HISTORY_CAPACITY")
                .map(|v| v as usize)
                .unwrap_or(defaults.history_capacity),
            output_dir: lookup("OUTPUT_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            settings_path: lookup("SETTINGS_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            random_seed: integer("RANDOM_SEED"),
        }
    }

    /// Overlays persisted user settings on top of this config.
    pub fn apply_settings(&mut self, settings: &UserSettings) {
        self.risk_profile = settings.risk_profile;
        self.min_profit_threshold = settings.min_profit_threshold;
        self.max_transaction_size = settings.max_transaction_size;
        self.gas_limit = settings.gas_limit;
        self.auto_execute = settings.auto_execute;
    }

    /// Rejects configurations that can only come from a programming or operator mistake.
    pub fn validate(&self) -> SimResult<()> {
        if self.min_profit_threshold < Decimal::ZERO {
            return Err(invalid("min_profit_threshold", "must not be negative"));
        }
        if self.complex_min_profit_threshold < Decimal::ZERO {
            return Err(invalid("complex_min_profit_threshold", "must not be negative"));
        }
        if self.trade_size_usd <= Decimal::ZERO {
            return Err(invalid("trade_size_usd", "must be positive"));
        }
        if self.max_transaction_size <= Decimal::ZERO {
            return Err(invalid("max_transaction_size", "must be positive"));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be greater than zero"));
        }
        if self.price_refresh_interval_ms == 0 {
            return Err(invalid("price_refresh_interval_ms", "must be greater than zero"));
        }
        if self.gas_refresh_interval_ms == 0 {
            return Err(invalid("gas_refresh_interval_ms", "must be greater than zero"));
        }
        if self.min_latency_ms > self.max_latency_ms {
            return Err(invalid("min_latency_ms", "must not exceed max_latency_ms"));
        }
        if self.max_concurrent_trades == 0 {
            return Err(invalid("max_concurrent_trades", "must be at least 1"));
        }
        if self.max_opportunities_per_bucket == 0 {
            return Err(invalid("max_opportunities_per_bucket", "must be at least 1"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be at least 1"));
        }
        if !self.rate_jitter_pct.is_finite() || self.rate_jitter_pct < 0.0 {
            return Err(invalid("rate_jitter_pct", "must be a non-negative number"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn price_ttl(&self) -> Duration {
        Duration::from_millis(self.price_ttl_ms)
    }

    pub fn price_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.price_refresh_interval_ms)
    }

    pub fn gas_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.gas_refresh_interval_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}

fn invalid(field: &str, reason: &str) -> SimError {
    SimError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.min_profit_threshold, dec!(0.5));
        assert_eq!(config.tick_interval_ms, 5_000);
        assert_eq!(config.risk_profile, RiskProfile::Moderate);
        assert!(!config.auto_execute);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_and_clamps_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("MIN_PROFIT_THRESHOLD", "1.25"),
            ("RISK_PROFILE", "aggressive"),
            ("TICK_INTERVAL_MS", "2000"),
            ("AUTO_EXECUTE", "true"),
            ("RATE_JITTER_PCT", "250"),
            ("VENUE_SAMPLE_SIZE", "1"),
            ("MAX_CONCURRENT_TRADES", "not-a-number"),
            ("GAS_REFRESH_INTERVAL_MS", "60000"),
            ("ENABLE_UPSTREAM_RATES", "true"),
        ]));
        assert_eq!(config.gas_refresh_interval_ms, 60_000);
        assert!(config.enable_upstream_rates);
        assert_eq!(config.upstream_quote_url, DEFAULT_UPSTREAM_QUOTE_URL);
        assert_eq!(config.min_profit_threshold, dec!(1.25));
        assert_eq!(config.risk_profile, RiskProfile::Aggressive);
        assert_eq!(config.tick_interval_ms, 2_000);
        assert!(config.auto_execute);
        assert_eq!(config.rate_jitter_pct, MAX_RATE_JITTER_PCT);
        assert_eq!(config.venue_sample_size, 2);
        assert_eq!(config.max_concurrent_trades, DEFAULT_MAX_CONCURRENT_TRADES);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = Config {
            min_profit_threshold: dec!(-0.1),
            ..Config::default()
        };
        match config.validate() {
            Err(SimError::InvalidConfig { field, .. }) => assert_eq!(field, "min_profit_threshold"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn inverted_latency_range_is_rejected() {
        let config = Config {
            min_latency_ms: 500,
            max_latency_ms: 100,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn user_settings_override_config() {
        let mut config = Config::default();
        let settings = UserSettings {
            risk_profile: RiskProfile::Conservative,
            min_profit_threshold: dec!(0.8),
            max_transaction_size: dec!(4),
            gas_limit: 50,
            auto_execute: true,
        };
        config.apply_settings(&settings);
        assert_eq!(config.risk_profile, RiskProfile::Conservative);
        assert_eq!(config.min_profit_threshold, dec!(0.8));
        assert_eq!(config.max_transaction_size, dec!(4));
        assert_eq!(config.gas_limit, 50);
        assert!(config.auto_execute);
    }
}
