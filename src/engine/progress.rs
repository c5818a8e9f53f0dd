//! Cross-worker progress reporting.
//!
//! One aggregator thread owns the counter and the display sink. Workers get a write-only
//! [`ProgressHandle`] and send increments over a channel, so no mutable state is shared
//! between workers. Workers batch their increments through [`ProgressBatch`] so a hot loop
//! does not pay a channel send per unit of work.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ENGINE;

enum ProgressMsg {
    Increase(u64),
    Close,
}

/// Display side of the tracker. Called only from the aggregator thread.
pub trait ProgressSink: Send {
    fn update(&mut self, completed: u64, total: u64, label: &str);

    fn finish(&mut self, completed: u64, total: u64, label: &str) {
        self.update(completed, total, label);
    }
}

/// Discards everything.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn update(&mut self, _completed: u64, _total: u64, _label: &str) {}
}

/// Logs once per `step_pct` percent, then a final line.
pub struct LogProgressSink {
    step_pct: u64,
    last_step: Option<u64>,
}

impl LogProgressSink {
    pub fn new(step_pct: u64) -> Self {
        Self {
            step_pct: step_pct.max(1),
            last_step: None,
        }
    }

    fn percent(completed: u64, total: u64) -> u64 {
        if total == 0 {
            100
        } else {
            (completed.min(total) * 100) / total
        }
    }
}

impl Default for LogProgressSink {
    fn default() -> Self {
        Self::new(ENGINE.progress.log_step_pct)
    }
}

impl ProgressSink for LogProgressSink {
    fn update(&mut self, completed: u64, total: u64, label: &str) {
        let pct = Self::percent(completed, total);
        let step = pct / self.step_pct;
        if self.last_step.is_none_or(|last| step > last) {
            self.last_step = Some(step);
            log::info!("{}: {:>3}% ({}/{})", label, pct, completed, total);
        }
    }

    fn finish(&mut self, completed: u64, total: u64, label: &str) {
        log::info!("{}: finished {}/{}", label, completed, total);
    }
}

/// Final state of a closed tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: u64,
    pub total: u64,
    pub label: String,
}

/// Owner of one progress aggregation. Opened once per top-level operation.
pub struct ProgressTracker {
    tx: Sender<ProgressMsg>,
    aggregator: Option<JoinHandle<ProgressSummary>>,
    total: u64,
    label: String,
}

impl ProgressTracker {
    pub fn open(total: u64, label: impl Into<String>, sink: impl ProgressSink + 'static) -> Self {
        let label = label.into();
        let (tx, rx) = channel();
        let min_redraw = Duration::from_millis(ENGINE.progress.min_redraw_ms);

        let thread_label = label.clone();
        let aggregator = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || aggregate(rx, total, thread_label, Box::new(sink), min_redraw));

        let aggregator = match aggregator {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Progress is cosmetic; run on without a display rather than failing the job.
                log::error!("Failed to spawn progress aggregator for {}: {}", label, e);
                None
            }
        };

        Self {
            tx,
            aggregator,
            total,
            label,
        }
    }

    /// Write-only capability handed to each worker.
    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle {
            tx: self.tx.clone(),
        }
    }

    /// Apply every increment sent so far, stop the aggregator and report the final count.
    pub fn close(mut self) -> ProgressSummary {
        self.shutdown()
    }

    fn shutdown(&mut self) -> ProgressSummary {
        let fallback = ProgressSummary {
            completed: 0,
            total: self.total,
            label: self.label.clone(),
        };
        let Some(aggregator) = self.aggregator.take() else {
            return fallback;
        };
        let _ = self.tx.send(ProgressMsg::Close);
        aggregator.join().unwrap_or_else(|_| {
            log::error!("Progress aggregator for {} panicked", self.label);
            fallback
        })
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        if self.aggregator.is_some() {
            self.shutdown();
        }
    }
}

fn aggregate(
    rx: Receiver<ProgressMsg>,
    total: u64,
    label: String,
    mut sink: Box<dyn ProgressSink>,
    min_redraw: Duration,
) -> ProgressSummary {
    let mut completed: u64 = 0;
    sink.update(completed, total, &label);
    let mut last_draw = Instant::now();

    // Close is queued behind every increment sent before it, so nothing is lost.
    while let Ok(msg) = rx.recv() {
        match msg {
            ProgressMsg::Increase(n) => {
                completed += n;
                if last_draw.elapsed() >= min_redraw {
                    sink.update(completed, total, &label);
                    last_draw = Instant::now();
                }
            }
            ProgressMsg::Close => break,
        }
    }

    sink.finish(completed, total, &label);
    ProgressSummary {
        completed,
        total,
        label,
    }
}

/// Cloneable, write-only reference to a tracker's counter.
#[derive(Clone)]
pub struct ProgressHandle {
    tx: Sender<ProgressMsg>,
}

impl ProgressHandle {
    pub fn increase(&self, n: u64) {
        if n > 0 {
            // A closed tracker drops late increments.
            let _ = self.tx.send(ProgressMsg::Increase(n));
        }
    }

    /// Worker-local batching: one send per `batch_size` ticks, remainder on finish or drop.
    pub fn batch(&self, batch_size: u64) -> ProgressBatch<'_> {
        ProgressBatch {
            handle: self,
            batch_size: batch_size.max(1),
            pending: 0,
        }
    }
}

pub struct ProgressBatch<'a> {
    handle: &'a ProgressHandle,
    batch_size: u64,
    pending: u64,
}

impl ProgressBatch<'_> {
    pub fn tick(&mut self) {
        self.pending += 1;
        if self.pending >= self.batch_size {
            self.flush();
        }
    }

    pub fn finish(mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        self.handle.increase(self.pending);
        self.pending = 0;
    }
}

impl Drop for ProgressBatch<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}
