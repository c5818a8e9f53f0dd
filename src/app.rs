//! Command-line flow: get prices, run the regression, hand both series to the sink.

use anyhow::{Context, Result, bail};
use rand::{SeedableRng, rngs::StdRng};

use crate::analysis::{parse_date, random_walk};
use crate::config::ENGINE;
use crate::data::{BinanceProvider, JsonSeriesSink, SeriesSink};
use crate::domain::{PriceField, prices_of_klines};
use crate::engine::{
    EngineSettings, LogProgressSink, available_workers, compute_windowed_series_with,
    fetch_partitioned,
};
use crate::utils::TimeUtils;
use crate::{Cli, PriceSource};

pub async fn run(args: Cli) -> Result<()> {
    let prices = load_prices(&args).await?;
    let window = match args.run.window {
        Some(window) => window,
        None => default_window(prices.len()),
    };
    if window >= prices.len() {
        bail!(
            "Window of {} needs more than {} prices",
            window,
            prices.len()
        );
    }

    let mut sink = JsonSeriesSink::new(&args.run.output_dir);
    sink.write_series(&format!("RealPlot_shift_{}", window), &prices[window..])?;

    if args.run.skip_regression {
        return Ok(());
    }

    let settings = EngineSettings {
        worker_count: args.run.workers.unwrap_or_else(available_workers),
        batch_size: args.run.batch_size,
        split_policy: args.run.split,
    };
    let selector = args.run.coefficient;

    let values = tokio::task::spawn_blocking(move || {
        compute_windowed_series_with(
            &prices,
            window,
            selector,
            &settings,
            LogProgressSink::default(),
        )
    })
    .await
    .context("Regression task did not complete")?
    .context("Windowed regression failed")?;

    sink.write_series(&format!("RegressionPlot_shift_{}", window), &values)?;
    Ok(())
}

/// Window used when none is given: a fixed fraction of the series, never below the minimum.
pub fn default_window(len: usize) -> usize {
    ((len as f64 * ENGINE.regression.window_fraction) as usize).max(ENGINE.regression.min_window)
}

async fn load_prices(args: &Cli) -> Result<Vec<f64>> {
    match &args.source {
        PriceSource::Market {
            symbol,
            start,
            end,
            interval,
        } => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            let Some(interval_ms) = TimeUtils::interval_from_string(interval) else {
                bail!("Unsupported interval '{}'", interval);
            };
            let concurrency = args.run.workers.unwrap_or(ENGINE.default_fetch_concurrency);

            log::info!(
                "Proceeding to data gather for {} from {} to {} ({})",
                symbol,
                start,
                end,
                interval
            );
            let provider = BinanceProvider::default();
            let klines =
                fetch_partitioned(&provider, symbol, interval_ms, start, end, concurrency)
                    .await
                    .with_context(|| format!("Failed to download klines for {}", symbol))?;
            if klines.is_empty() {
                bail!("No klines returned for {} between {} and {}", symbol, start, end);
            }
            Ok(prices_of_klines(&klines, PriceField::Close))
        }
        PriceSource::RandomWalk { size, seed } => {
            log::info!("Generating a random walk of {} values", size);
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            Ok(random_walk(*size, &mut rng))
        }
    }
}
