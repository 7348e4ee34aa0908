//! Venue descriptors and synthesized per-venue rates

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A simulated DEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    /// Taker fee as a fraction (0.0025 == 0.25%).
    pub fee_rate: Decimal,
    /// Fixed per-trade gas estimate in the reference currency.
    pub gas_cost: Decimal,
    /// 1 (thin) to 5 (deep). Deeper venues quote narrower spreads.
    pub liquidity_rating: u8,
}

impl Venue {
    pub fn new(id: &str, name: &str, fee_rate: Decimal, gas_cost: Decimal, liquidity_rating: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            fee_rate,
            gas_cost,
            liquidity_rating,
        }
    }
}

/// Venue-specific price for one token, in the reference currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueRate {
    pub token: String,
    pub venue: String,
    pub rate: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: DateTime<Utc>,
}
