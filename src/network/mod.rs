//! Upstream HTTP clients for prices and swap quotes

pub mod coingecko;
pub mod http;
pub mod jupiter;
pub mod retry;

pub use coingecko::*;
pub use jupiter::*;
pub use retry::*;
