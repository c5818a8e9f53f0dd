// Partitioning and the per-chunk numeric work
mod partition;
mod random_walk;
mod regression;

pub use partition::{SplitPolicy, parse_date, partition_indices, partition_months};
pub use random_walk::random_walk;
pub use regression::{LinearFit, regression_on_span};
