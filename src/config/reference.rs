//! Default token universe and venue table

use lazy_static::lazy_static;
use rust_decimal_macros::dec;

use crate::types::{Token, Venue};

/// Base tokens the triangular finder starts cycles from.
pub const DEFAULT_TRIANGULAR_BASES: [&str; 5] = ["USDC", "SOL", "USDT", "ETH", "BTC"];

/// Token that upstream swap quotes are priced against.
pub const UPSTREAM_RATE_QUOTE_TOKEN: &str = "USDC";

const STABLE_WALK_STEP: f64 = 0.0002;

lazy_static! {
    pub static ref DEFAULT_TOKENS: Vec<Token> = vec![
        Token::new("SOL", dec!(120.45))
            .with_name("Solana")
            .with_upstream_id("solana")
            .with_mint("So11111111111111111111111111111111111111112", 9),
        Token::new("BTC", dec!(67000))
            .with_name("Bitcoin")
            .with_upstream_id("bitcoin")
            .with_mint("9n4nbM75f5Ui33ZbPYXn59EwSgE8CGsHtAeTH5YFeJ9E", 6),
        Token::new("ETH", dec!(3200))
            .with_name("Ethereum")
            .with_upstream_id("ethereum")
            .with_mint("2FPyTwcZLUg1MDrwsyoP4D6s1tM7hAkHYRjkNb5w6Pxk", 8),
        Token::new("USDC", dec!(1.00))
            .with_name("USD Coin")
            .with_upstream_id("usd-coin")
            .with_mint("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6)
            .with_walk_step(STABLE_WALK_STEP),
        Token::new("USDT", dec!(0.999))
            .with_name("Tether")
            .with_upstream_id("tether")
            .with_mint("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", 6)
            .with_walk_step(STABLE_WALK_STEP),
        Token::new("JUP", dec!(1.35))
            .with_name("Jupiter")
            .with_upstream_id("jupiter")
            .with_mint("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZxfrEBUJ", 6),
        Token::new("RAY", dec!(0.68))
            .with_name("Raydium")
            .with_upstream_id("raydium")
            .with_mint("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", 6),
    ];

    // Gas estimates are the per-swap SOL fee converted at 120 USD/SOL.
    pub static ref DEFAULT_VENUES: Vec<Venue> = vec![
        Venue::new("jupiter", "Jupiter", dec!(0.0003), dec!(0.0006), 5),
        Venue::new("raydium", "Raydium", dec!(0.0025), dec!(0.00048), 4),
        Venue::new("orca", "Orca", dec!(0.003), dec!(0.00036), 4),
        Venue::new("openbook", "OpenBook", dec!(0.002), dec!(0.00048), 3),
        Venue::new("lifinity", "Lifinity", dec!(0.001), dec!(0.00072), 3),
    ];
}

pub fn default_tokens() -> Vec<Token> {
    DEFAULT_TOKENS.clone()
}

pub fn default_venues() -> Vec<Venue> {
    DEFAULT_VENUES.clone()
}
