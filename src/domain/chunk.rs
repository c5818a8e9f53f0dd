use {
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
    std::fmt,
};

use crate::utils::TimeUtils;

/// Half-open index range `[start, end)` over a price series.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexSpan {
    pub start: usize,
    pub end: usize,
}

impl IndexSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for IndexSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Half-open calendar range `[start, end)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end);
        Self { start, end }
    }

    pub fn start_ms(&self) -> i64 {
        TimeUtils::date_to_epoch_ms(self.start)
    }

    pub fn end_ms(&self) -> i64 {
        TimeUtils::date_to_epoch_ms(self.end)
    }

    /// Bounds rendered the way they are typed on the command line.
    pub fn as_strings(&self) -> (String, String) {
        (
            self.start.format(TimeUtils::RANGE_DATE_FORMAT).to_string(),
            self.end.format(TimeUtils::RANGE_DATE_FORMAT).to_string(),
        )
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (start, end) = self.as_strings();
        write!(f, "{} .. {}", start, end)
    }
}

/// A contiguous piece of a domain, tagged with its submission position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<S> {
    pub chunk_index: usize,
    pub span: S,
}

impl<S> Chunk<S> {
    pub fn new(chunk_index: usize, span: S) -> Self {
        Self { chunk_index, span }
    }
}

impl<S: fmt::Display> fmt::Display for Chunk<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chunk #{} {}", self.chunk_index, self.span)
    }
}
