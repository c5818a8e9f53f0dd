/// Everything a partitioned operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid domain: {reason}")]
    InvalidDomain { reason: String },

    #[error("degenerate regression window of {window} samples: x values have zero variance")]
    DegenerateWindow { window: usize },

    #[error("non-finite sample at position {position}")]
    NonFiniteSample { position: usize },

    #[error("chunk #{chunk_index} failed")]
    ChunkCompute {
        chunk_index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("merge is missing chunk results {missing:?}")]
    IncompleteResult { missing: Vec<usize> },

    #[error("worker pool unavailable: {reason}")]
    WorkerPool { reason: String },
}

impl EngineError {
    pub(crate) fn invalid_domain(reason: impl Into<String>) -> Self {
        EngineError::InvalidDomain {
            reason: reason.into(),
        }
    }

    /// Index of the chunk that aborted the run, if this is a compute failure.
    pub fn failed_chunk(&self) -> Option<usize> {
        match self {
            EngineError::ChunkCompute { chunk_index, .. } => Some(*chunk_index),
            _ => None,
        }
    }
}
