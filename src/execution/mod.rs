//! Trade execution simulation

pub mod simulation;

pub use simulation::*;
