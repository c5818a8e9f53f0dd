/// What a worker hands back for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResult<T> {
    pub chunk_index: usize,
    pub values: Vec<T>,
}

impl<T> WorkerResult<T> {
    pub fn new(chunk_index: usize, values: Vec<T>) -> Self {
        Self {
            chunk_index,
            values,
        }
    }
}

/// The message a worker sends back on the result channel.
#[derive(Debug)]
pub(crate) enum ChunkOutcome<T> {
    Done(WorkerResult<T>),
    Failed {
        chunk_index: usize,
        error: anyhow::Error,
    },
    /// Not started because an earlier chunk already failed.
    Skipped { chunk_index: usize },
}

impl<T> ChunkOutcome<T> {
    pub(crate) fn chunk_index(&self) -> usize {
        match self {
            ChunkOutcome::Done(result) => result.chunk_index,
            ChunkOutcome::Failed { chunk_index, .. } => *chunk_index,
            ChunkOutcome::Skipped { chunk_index } => *chunk_index,
        }
    }
}
