//! Bounded random walk for synthetic prices

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::random::RandomSource;
use crate::types::Token;

/// Maximum drift from the reference price, as a fraction.
pub const MAX_DRIFT: Decimal = dec!(0.20);

/// Moves `previous` by up to `token.walk_step` in either direction, clamped to
/// `reference_price ± MAX_DRIFT`.
pub fn next_price(previous: Decimal, token: &Token, rng: &mut dyn RandomSource) -> Decimal {
    let u = rng.range(-1.0, 1.0);
    let step = Decimal::from_f64(u * token.walk_step).unwrap_or(Decimal::ZERO);
    let moved = previous * (Decimal::ONE + step);

    let reference = token.reference_price;
    if reference <= Decimal::ZERO {
        return reference;
    }
    let floor = reference * (Decimal::ONE - MAX_DRIFT);
    let ceiling = reference * (Decimal::ONE + MAX_DRIFT);
    moved.clamp(floor, ceiling).round_dp(8)
}

/// Percent change of `price` against the token's reference price.
pub fn change_vs_reference(price: Decimal, token: &Token) -> Decimal {
    if token.reference_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((price / token.reference_price - Decimal::ONE) * dec!(100)).round_dp(2)
}
