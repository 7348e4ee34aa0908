//! Configuration management for the simulator

pub mod settings;
pub mod reference;

pub use settings::*;
pub use reference::*;
