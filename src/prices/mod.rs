//! Price cache, synthetic random walk and upstream source trait

pub mod cache;
pub mod random_walk;
pub mod source;

pub use cache::*;
pub use random_walk::*;
pub use source::*;
