use anyhow::Result;
use async_trait::async_trait;

use crate::config::BINANCE;
use crate::data::{GlobalRateLimiter, load_klines_range};
use crate::domain::{Kline, PairInterval};

/// Abstract interface for fetching market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Klines for `symbol` with open time in `[start_ms, end_ms)`, oldest first.
    ///
    /// Transient failures are retried inside the provider. An error returned here is final.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval_ms: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Kline>>;
}

pub struct BinanceProvider {
    limiter: GlobalRateLimiter,
}

impl BinanceProvider {
    pub fn new(limiter: GlobalRateLimiter) -> Self {
        Self { limiter }
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new(GlobalRateLimiter::new(BINANCE.limits.weight_limit_minute))
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval_ms: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Kline>> {
        let pair_interval = PairInterval::new(symbol, interval_ms);

        let bn_klines = load_klines_range(&pair_interval, start_ms, end_ms, &self.limiter).await?;

        // Convert using the From impl
        Ok(bn_klines.into_iter().map(Kline::from).collect())
    }
}
