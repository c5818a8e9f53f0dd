#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use smoother::data::MarketDataProvider;
use smoother::engine::ProgressSink;
use smoother::Kline;

pub const DAY_MS: i64 = 86_400_000;

/// Everything a sink saw, shared with the test after the sink moves into the tracker.
#[derive(Default, Debug)]
pub struct Recorded {
    pub updates: Vec<(u64, u64)>,
    pub finished: Option<(u64, u64)>,
    pub label: String,
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub seen: Arc<Mutex<Recorded>>,
}

impl ProgressSink for RecordingSink {
    fn update(&mut self, completed: u64, total: u64, label: &str) {
        let mut seen = self.seen.lock().unwrap();
        seen.updates.push((completed, total));
        seen.label = label.to_string();
    }

    fn finish(&mut self, completed: u64, total: u64, label: &str) {
        let mut seen = self.seen.lock().unwrap();
        seen.finished = Some((completed, total));
        seen.label = label.to_string();
    }
}

/// Serves one kline per interval, with the close equal to the open time in days.
/// Later chunks answer faster so completion order differs from chunk order.
pub struct SyntheticProvider {
    pub fail_from_ms: Option<i64>,
    pub calls: Mutex<Vec<(i64, i64)>>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            fail_from_ms: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_from(fail_from_ms: i64) -> Self {
        Self {
            fail_from_ms: Some(fail_from_ms),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval_ms: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Kline>> {
        self.calls.lock().unwrap().push((start_ms, end_ms));

        let delay = 40u64.saturating_sub(((start_ms / DAY_MS) % 40) as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if let Some(fail_from) = self.fail_from_ms {
            if start_ms >= fail_from {
                bail!("{}: Invalid symbol", symbol);
            }
        }

        let mut klines = Vec::new();
        let mut open = start_ms;
        while open < end_ms {
            let day = (open / DAY_MS) as f64;
            klines.push(Kline::new(open, day, day, day, day, 1.0, day));
            open += interval_ms;
        }
        Ok(klines)
    }
}
