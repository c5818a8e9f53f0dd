mod bn_kline;
mod provider;
mod rate_limiter;
mod series_sink;

pub use {
    bn_kline::{BNKline, BNKlineError, load_klines_range, try_interval_from_ms},
    provider::{BinanceProvider, MarketDataProvider},
    rate_limiter::GlobalRateLimiter,
    series_sink::{JsonSeriesSink, SeriesFile, SeriesSink},
};
