use std::{env, path::PathBuf};

use log::info;
use orchestrator::{OrchestratorError, configs::TrainingConfig, train};

fn main() -> Result<(), OrchestratorError> {
    env_logger::init();

    let path = env::args().nth(1).map(PathBuf::from).ok_or_else(|| {
        OrchestratorError::InvalidConfig("usage: orchestrator <training-config.json>".into())
    })?;

    let config = TrainingConfig::from_path(&path)?;
    let session = train(&config)?;
    let outcome = session.wait()?;

    info!(
        "trained {} round(s) over {} parameters with {} worker(s)",
        outcome.rounds,
        outcome.global.len(),
        outcome.workers.len()
    );

    Ok(())
}
