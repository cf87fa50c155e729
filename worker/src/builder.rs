use comms::specs::WorkerSpec;
use machine_learning::RecordFactoryRegistry;

use crate::{Result, Worker, WorkerDriver};

/// Builds `Worker`s, resolving their record factories against a registry.
#[derive(Debug, Clone, Default)]
pub struct WorkerBuilder {
    registry: RecordFactoryRegistry,
}

impl WorkerBuilder {
    /// Creates a new `WorkerBuilder` knowing every built-in record factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `WorkerBuilder` resolving record factories against `registry`.
    pub fn with_registry(registry: RecordFactoryRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RecordFactoryRegistry {
        &self.registry
    }

    /// Builds a `Worker` from a `WorkerSpec`.
    ///
    /// # Args
    /// * `spec` - The specification of the worker.
    ///
    /// # Returns
    /// A fully initialized `Worker` instance or the setup error.
    pub fn build(&self, spec: &WorkerSpec) -> Result<Worker> {
        let driver = WorkerDriver::setup(spec, &self.registry)?;
        Ok(Worker::new(driver))
    }
}
