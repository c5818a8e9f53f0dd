//! Runs one job per chunk on a bounded set of workers and collects the results.
//!
//! CPU-bound work goes through [`Dispatcher`], a dedicated rayon pool. I/O-bound work goes
//! through [`dispatch_async`], a bounded set of concurrent futures on the caller's runtime.
//! Both submit chunks in chunk order, collect results as they finish, and turn the first
//! failure into [`EngineError::ChunkCompute`] once every started chunk has returned.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;

use anyhow::anyhow;
use futures::{FutureExt, StreamExt, stream};

use crate::config::DF;
use crate::domain::Chunk;

use super::error::EngineError;
use super::messages::{ChunkOutcome, WorkerResult};
use super::progress::ProgressHandle;

/// Fixed-size worker pool. The threads live as long as the dispatcher.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    worker_count: usize,
}

impl Dispatcher {
    pub fn new(worker_count: usize) -> Result<Self, EngineError> {
        if worker_count < 1 {
            return Err(EngineError::invalid_domain("worker count must be at least 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("smoother-worker-{}", i))
            .build()
            .map_err(|e| EngineError::WorkerPool {
                reason: e.to_string(),
            })?;
        Ok(Self { pool, worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Execute `compute` once per chunk, at most `worker_count` at a time.
    ///
    /// Chunks are started in chunk order. The caller's thread only waits on the result channel;
    /// it never runs a chunk itself.
    pub fn run<S, T, F>(
        &self,
        chunks: Vec<Chunk<S>>,
        progress: &ProgressHandle,
        compute: F,
    ) -> Result<Vec<WorkerResult<T>>, EngineError>
    where
        S: Send,
        T: Send,
        F: Fn(&Chunk<S>, &ProgressHandle) -> anyhow::Result<Vec<T>> + Sync,
    {
        let mut collector = ResultCollector::new(chunks.len());
        let abort = AtomicBool::new(false);
        let (tx, rx) = channel::<ChunkOutcome<T>>();

        self.pool.in_place_scope_fifo(|scope| {
            for chunk in chunks {
                let tx = tx.clone();
                let handle = progress.clone();
                let abort = &abort;
                let compute = &compute;
                scope.spawn_fifo(move |_| {
                    let outcome = run_chunk(chunk.chunk_index, abort, || compute(&chunk, &handle));
                    // The receiver outlives the scope, so this only fails if the caller panicked.
                    let _ = tx.send(outcome);
                });
            }
            drop(tx);

            for outcome in rx.iter() {
                if collector.accept(outcome) {
                    abort.store(true, Ordering::Release);
                }
            }
        });

        collector.finish()
    }
}

/// I/O-bound counterpart of [`Dispatcher::run`]: up to `worker_count` chunk futures in flight.
pub async fn dispatch_async<S, T, F, Fut>(
    chunks: Vec<Chunk<S>>,
    worker_count: usize,
    progress: &ProgressHandle,
    compute: F,
) -> Result<Vec<WorkerResult<T>>, EngineError>
where
    F: Fn(Chunk<S>, ProgressHandle) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    if worker_count < 1 {
        return Err(EngineError::invalid_domain("worker count must be at least 1"));
    }

    let mut collector = ResultCollector::new(chunks.len());
    let abort = AtomicBool::new(false);
    let abort_ref = &abort;
    let compute = &compute;

    let mut outcomes = stream::iter(chunks)
        .map(|chunk| {
            let handle = progress.clone();
            async move {
                let chunk_index = chunk.chunk_index;
                if abort_ref.load(Ordering::Acquire) {
                    return ChunkOutcome::Skipped { chunk_index };
                }
                if DF.log_dispatch {
                    log::debug!("dispatch: starting chunk #{}", chunk_index);
                }
                match AssertUnwindSafe(compute(chunk, handle)).catch_unwind().await {
                    Ok(Ok(values)) => ChunkOutcome::Done(WorkerResult::new(chunk_index, values)),
                    Ok(Err(error)) => ChunkOutcome::Failed { chunk_index, error },
                    Err(panic) => ChunkOutcome::Failed {
                        chunk_index,
                        error: panic_to_error(panic),
                    },
                }
            }
        })
        .buffer_unordered(worker_count);

    while let Some(outcome) = outcomes.next().await {
        if collector.accept(outcome) {
            abort.store(true, Ordering::Release);
        }
    }

    collector.finish()
}

fn run_chunk<T>(
    chunk_index: usize,
    abort: &AtomicBool,
    compute: impl FnOnce() -> anyhow::Result<Vec<T>>,
) -> ChunkOutcome<T> {
    if abort.load(Ordering::Acquire) {
        return ChunkOutcome::Skipped { chunk_index };
    }
    if DF.log_dispatch {
        log::debug!("dispatch: starting chunk #{}", chunk_index);
    }
    match catch_unwind(AssertUnwindSafe(compute)) {
        Ok(Ok(values)) => ChunkOutcome::Done(WorkerResult::new(chunk_index, values)),
        Ok(Err(error)) => ChunkOutcome::Failed { chunk_index, error },
        Err(panic) => ChunkOutcome::Failed {
            chunk_index,
            error: panic_to_error(panic),
        },
    }
}

fn panic_to_error(panic: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let msg = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    anyhow!("worker panicked: {}", msg)
}

/// Gathers outcomes in completion order and remembers the first failure.
struct ResultCollector<T> {
    chunk_count: usize,
    received: usize,
    results: Vec<WorkerResult<T>>,
    failure: Option<(usize, anyhow::Error)>,
}

impl<T> ResultCollector<T> {
    fn new(chunk_count: usize) -> Self {
        Self {
            chunk_count,
            received: 0,
            results: Vec::with_capacity(chunk_count),
            failure: None,
        }
    }

    /// Returns true when the caller should stop starting new chunks.
    fn accept(&mut self, outcome: ChunkOutcome<T>) -> bool {
        self.received += 1;
        if DF.log_dispatch {
            log::debug!(
                "dispatch: chunk #{} returned ({}/{})",
                outcome.chunk_index(),
                self.received,
                self.chunk_count
            );
        }

        match outcome {
            ChunkOutcome::Done(result) => {
                // Once the run has failed there is nothing to merge into.
                if self.failure.is_none() {
                    self.results.push(result);
                }
                false
            }
            ChunkOutcome::Failed { chunk_index, error } => {
                if self.failure.is_none() {
                    log::error!("Chunk #{} failed: {:#}", chunk_index, error);
                    self.results.clear();
                    self.failure = Some((chunk_index, error));
                } else {
                    log::warn!("Chunk #{} also failed: {:#}", chunk_index, error);
                }
                true
            }
            ChunkOutcome::Skipped { .. } => false,
        }
    }

    fn finish(self) -> Result<Vec<WorkerResult<T>>, EngineError> {
        match self.failure {
            Some((chunk_index, source)) => Err(EngineError::ChunkCompute {
                chunk_index,
                source,
            }),
            None => Ok(self.results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndexSpan;
    use crate::engine::{NullProgressSink, ProgressTracker, merge_ordered};
    use anyhow::bail;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn chunks(n: usize) -> Vec<Chunk<IndexSpan>> {
        (0..n)
            .map(|i| Chunk::new(i, IndexSpan::new(i * 10, i * 10 + 10)))
            .collect()
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            Dispatcher::new(0),
            Err(EngineError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn results_come_back_for_every_chunk() {
        let dispatcher = Dispatcher::new(3).unwrap();
        let tracker = ProgressTracker::open(80, "run", NullProgressSink);
        let results = dispatcher
            .run(chunks(8), &tracker.handle(), |chunk, progress| {
                // Later chunks finish first.
                std::thread::sleep(Duration::from_millis((8 - chunk.chunk_index as u64) * 2));
                progress.increase(chunk.span.len() as u64);
                Ok((chunk.span.start..chunk.span.end).collect::<Vec<usize>>())
            })
            .unwrap();

        assert_eq!(tracker.close().completed, 80);
        assert_eq!(merge_ordered(results, 8).unwrap(), (0..80).collect::<Vec<_>>());
    }

    #[test]
    fn first_failure_wins_and_nothing_partial_escapes() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let tracker = ProgressTracker::open(0, "fail", NullProgressSink);
        let err = dispatcher
            .run(chunks(4), &tracker.handle(), |chunk, _| {
                if chunk.chunk_index == 2 {
                    bail!("boom");
                }
                Ok(vec![chunk.chunk_index])
            })
            .unwrap_err();

        assert_eq!(err.failed_chunk(), Some(2));
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "chunk #2 failed: boom"
        );
    }

    #[test]
    fn chunks_after_failure_are_not_started() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let tracker = ProgressTracker::open(0, "abort", NullProgressSink);
        let started = AtomicUsize::new(0);
        let err = dispatcher
            .run(chunks(6), &tracker.handle(), |chunk, _| {
                // Whichever chunk runs first breaks.
                if started.fetch_add(1, Ordering::SeqCst) == 0 {
                    bail!("first chunk broke");
                }
                // Give the collector time to raise the abort flag.
                std::thread::sleep(Duration::from_millis(20));
                Ok(vec![chunk.chunk_index])
            })
            .unwrap_err();

        assert!(err.failed_chunk().is_some());
        assert!(started.load(Ordering::SeqCst) < 6);
    }

    #[test]
    fn panicking_chunk_becomes_compute_error() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let tracker = ProgressTracker::open(0, "panic", NullProgressSink);
        let err = dispatcher
            .run(chunks(3), &tracker.handle(), |chunk, _| -> anyhow::Result<Vec<usize>> {
                if chunk.chunk_index == 1 {
                    panic!("bad chunk");
                }
                Ok(vec![chunk.chunk_index])
            })
            .unwrap_err();

        assert_eq!(err.failed_chunk(), Some(1));
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("bad chunk"));
    }

    #[test]
    fn single_worker_starts_chunks_in_chunk_order() {
        let dispatcher = Dispatcher::new(1).unwrap();
        assert_eq!(dispatcher.worker_count(), 1);
        let tracker = ProgressTracker::open(0, "order", NullProgressSink);
        let started = Mutex::new(Vec::new());
        dispatcher
            .run(chunks(7), &tracker.handle(), |chunk, _| {
                started.lock().unwrap().push(chunk.chunk_index);
                Ok(vec![chunk.chunk_index])
            })
            .unwrap();

        assert_eq!(started.into_inner().unwrap(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn empty_chunk_list_returns_nothing() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let tracker = ProgressTracker::open(0, "empty", NullProgressSink);
        let results = dispatcher
            .run(Vec::<Chunk<IndexSpan>>::new(), &tracker.handle(), |_, _| {
                Ok(Vec::<f64>::new())
            })
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn async_dispatch_merges_regardless_of_finish_order() {
        let tracker = ProgressTracker::open(5, "async", NullProgressSink);
        let results = dispatch_async(chunks(5), 5, &tracker.handle(), |chunk, progress| async move {
            tokio::time::sleep(Duration::from_millis(25 - 5 * chunk.chunk_index as u64)).await;
            progress.increase(1);
            Ok::<_, anyhow::Error>(vec![chunk.chunk_index])
        })
        .await
        .unwrap();

        let finish_order: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        assert_ne!(finish_order, vec![0, 1, 2, 3, 4]);
        assert_eq!(merge_ordered(results, 5).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(tracker.close().completed, 5);
    }

    #[tokio::test]
    async fn async_dispatch_with_one_slot_starts_chunks_in_chunk_order() {
        let tracker = ProgressTracker::open(0, "async-order", NullProgressSink);
        let started = Mutex::new(Vec::new());
        let started_ref = &started;
        dispatch_async(chunks(6), 1, &tracker.handle(), |chunk, _| async move {
            started_ref.lock().unwrap().push(chunk.chunk_index);
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok::<_, anyhow::Error>(vec![chunk.chunk_index])
        })
        .await
        .unwrap();

        assert_eq!(started.into_inner().unwrap(), (0..6).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn async_dispatch_reports_failing_chunk() {
        let tracker = ProgressTracker::open(0, "async-fail", NullProgressSink);
        let err = dispatch_async(chunks(3), 2, &tracker.handle(), |chunk, _| async move {
            if chunk.chunk_index == 1 {
                bail!("remote said no");
            }
            Ok(vec![chunk.chunk_index])
        })
        .await
        .unwrap_err();

        assert_eq!(err.failed_chunk(), Some(1));
    }
}
