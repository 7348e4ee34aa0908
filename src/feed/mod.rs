//! Opportunity feed

pub mod publisher;

pub use publisher::*;
