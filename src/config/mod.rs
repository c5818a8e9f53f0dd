//! Configuration module for the smoother application.

// Can all be private now because we have a public re-export.
mod binance;
mod debug;
mod engine;

// Re-export commonly used items
pub use binance::{BINANCE, BinanceApiConfig};
pub use debug::DF;
pub use engine::{ENGINE, LOG_PERFORMANCE};
