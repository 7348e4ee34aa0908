//! Logging setup and console display helpers

pub mod display;
pub mod logging;

pub use display::*;
pub use logging::*;
