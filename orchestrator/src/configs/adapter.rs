use std::num::NonZeroUsize;

use comms::specs::{ModelSpec, ServerSpec, WorkerSpec};
use machine_learning::{RecordFactoryRegistry, data};

use super::TrainingConfig;
use crate::error::OrchestratorError;

/// Turns a `TrainingConfig` into the specifications of the master and every worker.
#[derive(Debug, Clone, Default)]
pub struct Adapter {
    registry: RecordFactoryRegistry,
}

impl Adapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an `Adapter` that accepts the record factories known to `registry`.
    pub fn with_registry(registry: RecordFactoryRegistry) -> Self {
        Self { registry }
    }

    /// Validates `config` and splits its input among the workers.
    ///
    /// # Returns
    /// The master's spec and one spec per worker, worker `i` has id `"i"` and reads split `i`.
    ///
    /// # Errors
    /// `OrchestratorError::InvalidConfig` if anything in `config` is invalid.
    pub fn adapt_configs(
        &self,
        config: &TrainingConfig,
    ) -> Result<(ServerSpec, Vec<WorkerSpec>), OrchestratorError> {
        let model = ModelSpec {
            feature_vector_size: config.feature_vector_size,
            num_categories: config.num_categories,
            initial_value: config.initial_value,
        };

        let server = ServerSpec {
            workers: config.workers,
            rounds: config.rounds,
            model,
        };
        let workers = server.workers()?;
        server.rounds()?;

        if !self.registry.contains(&config.record_factory) {
            let known: Vec<_> = self.registry.identifiers().collect();
            return Err(OrchestratorError::InvalidConfig(format!(
                "unknown record factory `{}`, known factories are: {}",
                config.record_factory,
                known.join(", ")
            )));
        }

        let splits = self.split_input(config, workers)?;

        let workers = splits
            .into_iter()
            .enumerate()
            .map(|(i, split)| {
                let spec = WorkerSpec {
                    worker_id: i.to_string(),
                    model,
                    batch_size: config.batch_size,
                    record_factory: config.record_factory.clone(),
                    split,
                    end_of_data: config.end_of_data,
                    learning_rate: config.learning_rate,
                };

                spec.validate()?;
                Ok(spec)
            })
            .collect::<Result<Vec<_>, OrchestratorError>>()?;

        Ok((server, workers))
    }

    fn split_input(
        &self,
        config: &TrainingConfig,
        workers: NonZeroUsize,
    ) -> Result<Vec<comms::specs::SplitSpec>, OrchestratorError> {
        if config.input.as_os_str().is_empty() {
            return Err(OrchestratorError::InvalidConfig("`input` must not be empty".into()));
        }

        data::compute_splits(&config.input, workers).map_err(|e| {
            OrchestratorError::InvalidConfig(format!(
                "can't split input {}: {e}",
                config.input.display()
            ))
        })
    }
}
