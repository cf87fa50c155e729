use std::{num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::{ModelSpec, Result, SpecErr};

pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

/// What a worker does once its input split runs out of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfData {
    /// Reopen the split and keep reading from its start.
    #[default]
    Wrap,
    /// Stop reading, later batches come back empty.
    Stop,
}

/// Where a worker reads its records from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSpec {
    /// The lines of a file that start inside `start..end` bytes.
    File { path: PathBuf, start: u64, end: u64 },
    /// Records shipped along with the specification.
    Inline { records: Vec<String> },
}

impl SplitSpec {
    /// Checks that the split points somewhere.
    pub fn validate(&self) -> Result<()> {
        match self {
            SplitSpec::File { path, start, end } => {
                if path.as_os_str().is_empty() {
                    return Err(SpecErr::new("the input split location is empty"));
                }

                if start > end {
                    return Err(SpecErr::new(format!(
                        "the input split of {} starts at byte {start} after it ends at byte {end}",
                        path.display()
                    )));
                }

                Ok(())
            }
            SplitSpec::Inline { .. } => Ok(()),
        }
    }
}

/// The specification of a single worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub worker_id: String,
    pub model: ModelSpec,
    pub batch_size: usize,
    /// The identifier of the record factory used to parse raw records.
    pub record_factory: String,
    pub split: SplitSpec,
    #[serde(default)]
    pub end_of_data: EndOfData,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
}

impl WorkerSpec {
    /// Validates every field that doesn't depend on external collaborators.
    ///
    /// # Returns
    /// The length of the parameter vector and the batch size.
    pub fn validate(&self) -> Result<(usize, NonZeroUsize)> {
        if self.worker_id.is_empty() {
            return Err(SpecErr::new("`worker_id` must not be empty"));
        }

        let params = self.model.params()?;
        let batch_size =
            NonZeroUsize::new(self.batch_size).ok_or_else(|| SpecErr::not_positive("batch_size"))?;

        if self.record_factory.is_empty() {
            return Err(SpecErr::new("`record_factory` must not be empty"));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return Err(SpecErr::not_positive("learning_rate"));
        }

        self.split.validate()?;
        Ok((params, batch_size))
    }
}
