//! Gas price tracking

pub mod tracker;

pub use tracker::*;
