//! Venue rate synthesis and upstream quote overlay

pub mod source;
pub mod synthesizer;
pub mod upstream;

pub use source::*;
pub use synthesizer::*;
pub use upstream::*;
