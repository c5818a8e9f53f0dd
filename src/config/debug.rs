//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Log every chunk as the partitioner emits it.
    pub log_partitions: bool,

    /// Log each chunk as a worker picks it up and hands it back.
    pub log_dispatch: bool,

    /// Log every kline page requested from the exchange.
    pub log_kline_pages: bool,

    /// Activate trace_time macro (for scope-level timing)
    pub log_performance: bool,
}

pub const DF: LogFlags = LogFlags {
    log_partitions: false,
    log_dispatch: false,
    log_kline_pages: false,
    log_performance: false,
};
