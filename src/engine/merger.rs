use std::collections::BTreeSet;

use super::error::EngineError;
use super::messages::WorkerResult;

/// Order chunk results by `chunk_index` and concatenate them.
///
/// Every index in `0..chunk_count` must be present exactly once.
pub fn merge_ordered<T>(
    mut results: Vec<WorkerResult<T>>,
    chunk_count: usize,
) -> Result<Vec<T>, EngineError> {
    results.sort_by_key(|r| r.chunk_index);

    let dense = results.len() == chunk_count
        && results.iter().enumerate().all(|(i, r)| r.chunk_index == i);
    if !dense {
        let present: BTreeSet<usize> = results.iter().map(|r| r.chunk_index).collect();
        let missing: Vec<usize> = (0..chunk_count).filter(|i| !present.contains(i)).collect();
        log::error!(
            "Merge expected {} chunk results, got {} (missing {:?})",
            chunk_count,
            results.len(),
            missing
        );
        return Err(EngineError::IncompleteResult { missing });
    }

    let total = results.iter().map(|r| r.values.len()).sum();
    let mut merged = Vec::with_capacity(total);
    for result in results {
        merged.extend(result.values);
    }
    Ok(merged)
}
