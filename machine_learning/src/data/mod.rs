//! Input splits, the partitions of a dataset each worker reads its raw records from.

mod shard;
mod split;

pub use shard::{compute_splits, shard_range};
pub use split::{FileSplit, MemorySplit, RecordReader, SplitSource};

use comms::specs::SplitSpec;

/// Builds the split source described by `spec`.
pub fn from_spec(spec: &SplitSpec) -> Box<dyn SplitSource> {
    match spec {
        SplitSpec::File { path, start, end } => Box::new(FileSplit::new(path, *start, *end)),
        SplitSpec::Inline { records } => Box::new(MemorySplit::new(records.clone())),
    }
}
