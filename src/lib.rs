//! Solana MEV opportunity simulator
//!
//! Generates synthetic token prices, fabricates per-venue rates for a set of
//! Solana DEXs, scans them for simple, triangular and multi-hop arbitrage, and
//! simulates execution of selected opportunities. Nothing here touches a chain;
//! the optional network calls are best-effort CoinGecko prices and Jupiter
//! swap quotes.

pub mod config;
pub mod types;
pub mod errors;
pub mod random;
pub mod events;
pub mod network;
pub mod prices;
pub mod rates;
pub mod gas;
pub mod arbitrage;
pub mod feed;
pub mod execution;
pub mod storage;
pub mod engine;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use engine::SimulationEngine;
pub use errors::{SimError, SimResult};
pub use events::EngineEvent;
pub use random::{RandomSource, SeededRandom, SequenceRandom, SharedRandom};
pub use types::*;
