//! Tunables for the partitioned execution engine.

use crate::analysis::SplitPolicy;
use crate::domain::CoefficientSelector;

pub struct ProgressConfig {
    /// Sub-units a worker counts locally before sending one increment.
    pub batch_size: u64,
    /// Minimum gap between two sink redraws. The final state is always drawn.
    pub min_redraw_ms: u64,
    /// The log sink reports once per this many percent.
    pub log_step_pct: u64,
}

pub struct RegressionDefaults {
    pub coefficient: CoefficientSelector,
    /// Window size as a fraction of the series length when none is given.
    /// Higher fraction - smoother, less similar to the raw series.
    pub window_fraction: f64,
    pub min_window: usize,
}

pub struct EngineConfig {
    pub progress: ProgressConfig,
    pub regression: RegressionDefaults,
    pub split_policy: SplitPolicy,
    /// How many monthly fetch chunks may be in flight at once when no worker count is given.
    pub default_fetch_concurrency: usize,
}

pub const ENGINE: EngineConfig = EngineConfig {
    progress: ProgressConfig {
        batch_size: 100,
        min_redraw_ms: 250,
        log_step_pct: 10,
    },
    regression: RegressionDefaults {
        coefficient: CoefficientSelector::AB,
        window_fraction: 0.05,
        min_window: 2,
    },
    split_policy: SplitPolicy::Parity,
    default_fetch_concurrency: 4,
};

pub const LOG_PERFORMANCE: bool = crate::config::DF.log_performance;
