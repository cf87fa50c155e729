use std::{fs, io, num::NonZeroUsize, ops::Range, path::Path};

use comms::specs::SplitSpec;

/// Splits `total` bytes among `parts` and returns the range of part `i`.
///
/// Ranges are contiguous, disjoint and cover `0..total`, their sizes differ by at most 1.
pub fn shard_range(total: u64, i: usize, parts: NonZeroUsize) -> Range<u64> {
    let (i, parts) = (i as u64, parts.get() as u64);

    let base = total / parts;
    let rem = total % parts;

    let start = i * base + i.min(rem);
    let extra = if i < rem { 1 } else { 0 };

    start..start + base + extra
}

/// Cuts the file at `path` into `parts` balanced byte ranges.
///
/// # Returns
/// One `SplitSpec::File` per part, in order.
pub fn compute_splits(path: &Path, parts: NonZeroUsize) -> io::Result<Vec<SplitSpec>> {
    let total = fs::metadata(path)?.len();

    let splits = (0..parts.get())
        .map(|i| {
            let Range { start, end } = shard_range(total, i, parts);
            SplitSpec::File {
                path: path.to_path_buf(),
                start,
                end,
            }
        })
        .collect();

    Ok(splits)
}
