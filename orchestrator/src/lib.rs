pub mod configs;
pub mod error;
mod session;

use configs::{Adapter, TrainingConfig};
use worker::WorkerBuilder;

pub use error::OrchestratorError;
pub use session::{Session, TrainingOutcome};

/// Starts a local training run and returns its active session.
///
/// # Errors
/// Returns an `OrchestratorError` if the configuration is invalid or a node fails its setup.
pub fn train(config: &TrainingConfig) -> Result<Session, OrchestratorError> {
    log::info!("adapting configs");
    let adapter = Adapter::new();
    let (server, workers) = adapter.adapt_configs(config)?;

    log::info!(
        "starting {} worker(s) for {} round(s)",
        workers.len(),
        server.rounds
    );
    Session::new(&server, &workers, &WorkerBuilder::new())
}
