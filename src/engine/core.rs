use std::num::NonZeroUsize;
use std::thread;

use anyhow::Context;
use chrono::NaiveDate;

use crate::analysis::{SplitPolicy, partition_indices, partition_months, regression_on_span};
use crate::config::ENGINE;
use crate::data::MarketDataProvider;
use crate::domain::{CoefficientSelector, Kline, PairInterval};
use crate::utils::{TimeUtils, format_duration};

use super::dispatcher::{Dispatcher, dispatch_async};
use super::error::EngineError;
use super::merger::merge_ordered;
use super::progress::{LogProgressSink, ProgressSink, ProgressTracker};

/// Runtime knobs for one partitioned operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub worker_count: usize,
    /// Sub-units a worker counts before reporting progress.
    pub batch_size: u64,
    pub split_policy: SplitPolicy,
}

impl EngineSettings {
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            worker_count: available_workers(),
            batch_size: ENGINE.progress.batch_size,
            split_policy: ENGINE.split_policy,
        }
    }
}

/// Number of hardware threads, or 1 if that cannot be determined.
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Sliding-window regression over `prices`, one value per position `window_size..len`.
pub fn compute_windowed_series(
    prices: &[f64],
    window_size: usize,
    selector: CoefficientSelector,
    worker_count: usize,
) -> Result<Vec<f64>, EngineError> {
    compute_windowed_series_with(
        prices,
        window_size,
        selector,
        &EngineSettings::with_workers(worker_count),
        LogProgressSink::default(),
    )
}

pub fn compute_windowed_series_with(
    prices: &[f64],
    window_size: usize,
    selector: CoefficientSelector,
    settings: &EngineSettings,
    sink: impl ProgressSink + 'static,
) -> Result<Vec<f64>, EngineError> {
    if window_size < ENGINE.regression.min_window {
        return Err(EngineError::invalid_domain(format!(
            "window size must be at least {}, got {}",
            ENGINE.regression.min_window, window_size
        )));
    }
    if window_size >= prices.len() {
        return Err(EngineError::invalid_domain(format!(
            "window size {} must be smaller than the {} prices available",
            window_size,
            prices.len()
        )));
    }

    let chunks = partition_indices(
        window_size,
        prices.len(),
        settings.worker_count,
        settings.split_policy,
    )?;
    let chunk_count = chunks.len();
    let dispatcher = Dispatcher::new(settings.worker_count)?;
    log::info!(
        "Regression '{}' over {} prices (window {}) in {} chunks on {} workers",
        selector,
        prices.len(),
        window_size,
        chunk_count,
        dispatcher.worker_count()
    );

    let tracker = ProgressTracker::open(
        (prices.len() - window_size) as u64,
        "LinearRegressionProgress",
        sink,
    );

    let batch_size = settings.batch_size;
    let results = crate::trace_time!("windowed regression", 1_000_000, {
        dispatcher.run(chunks, &tracker.handle(), |chunk, progress| {
            regression_on_span(prices, window_size, chunk.span, selector, progress, batch_size)
                .map_err(anyhow::Error::from)
        })
    });

    let summary = tracker.close();
    log::debug!(
        "{}: {}/{} positions reported",
        summary.label,
        summary.completed,
        summary.total
    );

    merge_ordered(results?, chunk_count)
}

/// Fetch klines for `[start, end)` one calendar month per chunk, merged in time order.
pub async fn fetch_partitioned<P>(
    provider: &P,
    symbol: &str,
    interval_ms: i64,
    start: NaiveDate,
    end: NaiveDate,
    worker_count: usize,
) -> Result<Vec<Kline>, EngineError>
where
    P: MarketDataProvider + ?Sized,
{
    fetch_partitioned_with(
        provider,
        &PairInterval::new(symbol, interval_ms),
        start,
        end,
        worker_count,
        LogProgressSink::default(),
    )
    .await
}

pub async fn fetch_partitioned_with<P>(
    provider: &P,
    pair_interval: &PairInterval,
    start: NaiveDate,
    end: NaiveDate,
    worker_count: usize,
    sink: impl ProgressSink + 'static,
) -> Result<Vec<Kline>, EngineError>
where
    P: MarketDataProvider + ?Sized,
{
    if pair_interval.interval_ms <= 0 {
        return Err(EngineError::invalid_domain(format!(
            "interval must be positive, got {}ms",
            pair_interval.interval_ms
        )));
    }

    let chunks = partition_months(start, end)?;
    let chunk_count = chunks.len();
    let span_ms = TimeUtils::date_to_epoch_ms(end) - TimeUtils::date_to_epoch_ms(start);
    log::info!(
        "Fetching {} from {} to {} ({}) in {} monthly chunks ({} at a time)",
        pair_interval,
        start,
        end,
        format_duration(span_ms),
        chunk_count,
        worker_count
    );

    // Progress is counted in klines; the expected total ignores exchange gaps.
    let expected = (span_ms / pair_interval.interval_ms).max(0) as u64;
    let tracker = ProgressTracker::open(expected, format!("Klines {}", pair_interval), sink);

    let results = dispatch_async(
        chunks,
        worker_count,
        &tracker.handle(),
        |chunk, progress| async move {
            let klines = provider
                .fetch_klines(
                    pair_interval.name(),
                    pair_interval.interval_ms,
                    chunk.span.start_ms(),
                    chunk.span.end_ms(),
                )
                .await
                .with_context(|| format!("fetching {} for {}", chunk.span, pair_interval))?;
            progress.increase(klines.len() as u64);
            Ok::<_, anyhow::Error>(klines)
        },
    )
    .await;

    let summary = tracker.close();
    log::debug!(
        "{}: {} klines fetched (about {} expected)",
        summary.label,
        summary.completed,
        summary.total
    );

    merge_ordered(results?, chunk_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullProgressSink;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_prices_give_unit_slope() {
        let prices: Vec<f64> = (1..=100).map(f64::from).collect();
        let values = compute_windowed_series(&prices, 10, CoefficientSelector::A, 4).unwrap();
        assert_eq!(values.len(), 90);
        for value in values {
            assert_abs_diff_eq!(value, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn one_extra_price_gives_one_value() {
        let prices = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0];
        let values = compute_windowed_series(&prices, 5, CoefficientSelector::AB, 3).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn window_must_fit_inside_prices() {
        let prices = [1.0, 2.0, 3.0];
        for window in [0, 1, 3, 4] {
            assert!(matches!(
                compute_windowed_series(&prices, window, CoefficientSelector::A, 2),
                Err(EngineError::InvalidDomain { .. })
            ));
        }
    }

    #[test]
    fn zero_workers_is_invalid() {
        let prices: Vec<f64> = (0..20).map(f64::from).collect();
        assert!(matches!(
            compute_windowed_series(&prices, 5, CoefficientSelector::B, 0),
            Err(EngineError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn worker_count_does_not_change_the_series() {
        let prices: Vec<f64> = (0..500).map(|i| ((i as f64) * 0.37).sin() * 10.0 + i as f64).collect();
        let reference = compute_windowed_series_with(
            &prices,
            25,
            CoefficientSelector::AB,
            &EngineSettings {
                worker_count: 1,
                batch_size: 100,
                split_policy: SplitPolicy::Parity,
            },
            NullProgressSink,
        )
        .unwrap();

        for (workers, policy) in [(2, SplitPolicy::Parity), (3, SplitPolicy::Parity), (7, SplitPolicy::Ceil)] {
            let settings = EngineSettings {
                worker_count: workers,
                batch_size: 13,
                split_policy: policy,
            };
            let values =
                compute_windowed_series_with(&prices, 25, CoefficientSelector::AB, &settings, NullProgressSink)
                    .unwrap();
            assert_eq!(values, reference);
        }
    }

    #[test]
    fn available_workers_is_positive() {
        assert!(available_workers() >= 1);
        assert_eq!(EngineSettings::with_workers(3).worker_count, 3);
    }
}
