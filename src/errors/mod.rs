//! Error types and upstream failure protection

pub mod sim_error;
pub mod circuit_breaker;

pub use sim_error::*;
pub use circuit_breaker::*;
