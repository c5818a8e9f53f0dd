// Domain types and value objects
mod chunk;
mod coefficient;
mod kline;
mod pair_interval;

pub use chunk::{Chunk, DateSpan, IndexSpan};
pub use coefficient::CoefficientSelector;
pub use kline::{Kline, PriceField, prices_of_klines};
pub use pair_interval::PairInterval;
