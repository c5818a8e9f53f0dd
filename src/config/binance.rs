pub struct BinanceApiConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for BinanceApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: BINANCE.client.timeout_ms,
            retries: BINANCE.client.retries,
            backoff_ms: BINANCE.client.backoff_ms,
        }
    }
}

/// REST constraints: 1000 klines per page, weight budget and call costs.
pub struct RestLimits {
    pub klines_limit: i32,
    pub weight_limit_minute: u32,
    pub kline_call_weight: u32,
}

/// Lower-case fragments of the Binance error messages the fetcher reacts to.
/// The connector hands over only the `msg` of an error body, never its `code`.
pub struct ErrorMessages {
    /// Code -1003.
    pub weight_exceeded: &'static str,
    /// Code -2015.
    pub no_permissions: &'static str,
    /// Code -1121.
    pub invalid_symbol: &'static str,
}

pub struct ClientDefaults {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    /// Pause before retrying a page after a network failure. Network failures retry forever.
    pub retry_delay_ms: u64,
}

pub struct BinanceConfig {
    pub limits: RestLimits,
    pub errors: ErrorMessages,
    pub client: ClientDefaults,
}

pub const BINANCE: BinanceConfig = BinanceConfig {
    limits: RestLimits {
        klines_limit: 1000,
        weight_limit_minute: 6000,
        kline_call_weight: 2,
    },
    errors: ErrorMessages {
        weight_exceeded: "too much request weight",
        no_permissions: "invalid api-key",
        invalid_symbol: "invalid symbol",
    },
    client: ClientDefaults {
        timeout_ms: 5000,
        retries: 5,
        backoff_ms: 5000,
        retry_delay_ms: 1000,
    },
};
