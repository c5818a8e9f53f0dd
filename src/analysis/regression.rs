//! Least-squares line over a trailing window of samples.
//!
//! The x axis is the window-local index `0..W`, so the slope is "price change per candle" and
//! the intercept is the fitted value at the oldest sample of the window.

use crate::domain::{CoefficientSelector, IndexSpan};
use crate::engine::{EngineError, ProgressHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Slope.
    pub a: f64,
    /// Intercept.
    pub b: f64,
}

impl LinearFit {
    /// Fit `y = a·x + b` through `window`, with `x = 0..window.len()`.
    pub fn from_window(window: &[f64]) -> Result<Self, EngineError> {
        Self::fit(window, 0)
    }

    // `base` is the global position of window[0], used only for error reporting.
    fn fit(window: &[f64], base: usize) -> Result<Self, EngineError> {
        let n = window.len();
        if n < 2 {
            return Err(EngineError::DegenerateWindow { window: n });
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_xx = 0.0;
        for (i, &y) in window.iter().enumerate() {
            if !y.is_finite() {
                return Err(EngineError::NonFiniteSample { position: base + i });
            }
            let x = i as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += y * x;
            sum_xx += x * x;
        }

        let n_f = n as f64;
        let mean_x = sum_x / n_f;
        let mean_y = sum_y / n_f;

        let denominator = sum_xx - n_f * mean_x * mean_x;
        if denominator == 0.0 {
            return Err(EngineError::DegenerateWindow { window: n });
        }

        let a = (sum_xy - n_f * mean_y * mean_x) / denominator;
        let b = mean_y - a * mean_x;
        Ok(LinearFit { a, b })
    }

    pub fn coefficient(&self, selector: CoefficientSelector) -> f64 {
        match selector {
            CoefficientSelector::A => self.a,
            CoefficientSelector::B => self.b,
            CoefficientSelector::AB => self.a + self.b,
        }
    }
}

/// One coefficient per position `i` in `span`, each fitted on `prices[i - window..i]`.
///
/// Reads from the whole price slice but produces output only for its own span, so chunks can
/// run side by side over one shared read-only series. Progress is reported in batches of
/// `batch_size` positions plus a final flush.
pub fn regression_on_span(
    prices: &[f64],
    window: usize,
    span: IndexSpan,
    selector: CoefficientSelector,
    progress: &ProgressHandle,
    batch_size: u64,
) -> Result<Vec<f64>, EngineError> {
    if span.start < window || span.end > prices.len() {
        return Err(EngineError::invalid_domain(format!(
            "span {} needs prices [{}, {}) but only {} are available",
            span,
            span.start.saturating_sub(window),
            span.end,
            prices.len()
        )));
    }

    let mut batch = progress.batch(batch_size);
    let mut coefficients = Vec::with_capacity(span.len());
    for i in span.start..span.end {
        let fit = LinearFit::fit(&prices[i - window..i], i - window)?;
        coefficients.push(fit.coefficient(selector));
        batch.tick();
    }
    batch.finish();

    Ok(coefficients)
}
