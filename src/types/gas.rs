//! Network gas price status

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

const LOW_BAND: Decimal = dec!(0.8);
const HIGH_BAND: Decimal = dec!(1.2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    Low,
    Normal,
    High,
}

impl CongestionLevel {
    /// Low below 80% of the running average, high above 120%, normal in between.
    pub fn classify(current: Decimal, average: Decimal) -> Self {
        if current < average * LOW_BAND {
            CongestionLevel::Low
        } else if current > average * HIGH_BAND {
            CongestionLevel::High
        } else {
            CongestionLevel::Normal
        }
    }

    /// Multiplier applied to every venue's gas estimate.
    pub fn gas_multiplier(&self) -> Decimal {
        match self {
            CongestionLevel::Low => dec!(0.8),
            CongestionLevel::Normal => Decimal::ONE,
            CongestionLevel::High => dec!(1.5),
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CongestionLevel::Low => write!(f, "low"),
            CongestionLevel::Normal => write!(f, "normal"),
            CongestionLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasSample {
    /// Gas price in Gwei.
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasStatus {
    pub current_price: Decimal,
    pub average_price: Decimal,
    pub congestion: CongestionLevel,
    pub samples: usize,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congestion_bands() {
        let average = dec!(25);
        assert_eq!(CongestionLevel::classify(dec!(19.99), average), CongestionLevel::Low);
        assert_eq!(CongestionLevel::classify(dec!(20), average), CongestionLevel::Normal);
        assert_eq!(CongestionLevel::classify(dec!(25), average), CongestionLevel::Normal);
        assert_eq!(CongestionLevel::classify(dec!(30), average), CongestionLevel::Normal);
        assert_eq!(CongestionLevel::classify(dec!(30.01), average), CongestionLevel::High);
    }

    #[test]
    fn congestion_scales_gas() {
        assert_eq!(CongestionLevel::Low.gas_multiplier(), dec!(0.8));
        assert_eq!(CongestionLevel::Normal.gas_multiplier(), dec!(1));
        assert_eq!(CongestionLevel::High.gas_multiplier(), dec!(1.5));
        assert_eq!(CongestionLevel::High.to_string(), "high");
    }
}
