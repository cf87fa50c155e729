use std::{fs, path::Path, path::PathBuf};

use comms::specs::{DEFAULT_LEARNING_RATE, EndOfData};
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

/// The configuration of a whole training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    pub feature_vector_size: usize,
    pub num_categories: usize,
    pub batch_size: usize,
    /// The identifier of the record factory parsing the input.
    pub record_factory: String,
    /// The file split among the workers.
    pub input: PathBuf,
    pub workers: usize,
    pub rounds: usize,
    #[serde(default)]
    pub end_of_data: EndOfData,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default)]
    pub initial_value: f32,
}

impl TrainingConfig {
    /// Parses a JSON configuration.
    ///
    /// # Errors
    /// `OrchestratorError::InvalidConfig` naming the missing or invalid field.
    pub fn from_json(raw: &str) -> Result<Self, OrchestratorError> {
        serde_json::from_str(raw).map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))
    }

    /// Reads a JSON configuration from `path`.
    pub fn from_path(path: &Path) -> Result<Self, OrchestratorError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            OrchestratorError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;

        Self::from_json(&raw)
    }
}
