//! Splits an ordered domain into contiguous chunks sized to the available workers.
//!
//! Two domains are supported: index ranges over a price series (regression) and calendar
//! spans (historical fetches, one chunk per month).

use {
    chrono::{Months, NaiveDate},
    serde::{Deserialize, Serialize},
};

use crate::config::DF;
use crate::domain::{Chunk, DateSpan, IndexSpan};
use crate::engine::EngineError;
use crate::utils::TimeUtils;

/// How the stride between chunk boundaries is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum SplitPolicy {
    /// `span / P` for an even worker count, `span / (P - 1)` for an odd one, so one worker is
    /// left to soak up the remainder. The last chunk absorbs whatever is left over.
    #[default]
    Parity,
    /// `ceil(span / P)`. The last chunk is whatever remains.
    Ceil,
}

impl SplitPolicy {
    fn step(self, span: usize, workers: usize) -> usize {
        match self {
            SplitPolicy::Parity if workers == 1 => span,
            SplitPolicy::Parity if workers % 2 == 0 => span / workers,
            SplitPolicy::Parity => span / (workers - 1),
            SplitPolicy::Ceil => span.div_ceil(workers),
        }
    }
}

/// Partition `[start, n)` into ordered chunks for `workers` workers.
///
/// For the regression `start` is the window size: earlier positions cannot fill a window.
/// An empty range yields no chunks. Fewer positions than workers yields a single chunk.
pub fn partition_indices(
    start: usize,
    n: usize,
    workers: usize,
    policy: SplitPolicy,
) -> Result<Vec<Chunk<IndexSpan>>, EngineError> {
    if workers < 1 {
        return Err(EngineError::invalid_domain("worker count must be at least 1"));
    }
    if start > n {
        return Err(EngineError::invalid_domain(format!(
            "range start {} lies beyond domain size {}",
            start, n
        )));
    }

    let span = n - start;
    if span == 0 {
        return Ok(Vec::new());
    }

    let step = policy.step(span, workers);
    if step == 0 {
        return Ok(vec![Chunk::new(0, IndexSpan::new(start, n))]);
    }

    let mut chunks = Vec::new();
    let mut lo = start;
    while lo < n {
        let hi = match policy {
            // Fewer than two full strides left: this is the last chunk.
            SplitPolicy::Parity if n - lo < 2 * step => n,
            _ => (lo + step).min(n),
        };
        chunks.push(Chunk::new(chunks.len(), IndexSpan::new(lo, hi)));
        lo = hi;
    }

    if DF.log_partitions {
        for chunk in &chunks {
            log::debug!("partition: {}", chunk);
        }
    }
    Ok(chunks)
}

/// Partition `[start, end)` into one-calendar-month chunks, the last one clipped to `end`.
pub fn partition_months(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Chunk<DateSpan>>, EngineError> {
    if start >= end {
        return Err(EngineError::invalid_domain(format!(
            "start date {} must be before end date {}",
            start, end
        )));
    }

    let mut chunks = Vec::new();
    let mut current = start;
    while current < end {
        let next = current
            .checked_add_months(Months::new(1))
            .ok_or_else(|| EngineError::invalid_domain(format!("date overflow after {}", current)))?;
        let clipped = next.min(end);
        chunks.push(Chunk::new(chunks.len(), DateSpan::new(current, clipped)));
        current = clipped;
    }

    if DF.log_partitions {
        for chunk in &chunks {
            log::debug!("partition: {}", chunk);
        }
    }
    Ok(chunks)
}

/// Parse a range boundary, either `01 Jan 2024` or `2024-01-01`.
pub fn parse_date(text: &str) -> Result<NaiveDate, EngineError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, TimeUtils::RANGE_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, TimeUtils::STANDARD_TIME_FORMAT))
        .map_err(|e| EngineError::invalid_domain(format!("unparseable date '{}': {}", text, e)))
}
