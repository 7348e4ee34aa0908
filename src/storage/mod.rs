//! Data persistence and file operations

pub mod executions;
pub mod history;
pub mod opportunities;
pub mod settings;

pub use executions::*;
pub use history::*;
pub use opportunities::*;
pub use settings::*;
