mod core;
mod dispatcher;
mod error;
mod merger;
mod messages;
mod progress;

pub use core::{
    EngineSettings, available_workers, compute_windowed_series, compute_windowed_series_with,
    fetch_partitioned, fetch_partitioned_with,
};
pub use dispatcher::{Dispatcher, dispatch_async};
pub use error::EngineError;
pub use merger::merge_ordered;
pub use messages::WorkerResult;
pub use progress::{
    LogProgressSink, NullProgressSink, ProgressBatch, ProgressHandle, ProgressSink,
    ProgressSummary, ProgressTracker,
};
