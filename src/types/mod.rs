//! Core data types and structures

pub mod token;
pub mod venue;
pub mod opportunity;
pub mod execution;
pub mod gas;

pub use token::*;
pub use venue::*;
pub use opportunity::*;
pub use execution::*;
pub use gas::*;
