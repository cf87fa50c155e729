use comms::{
    ParameterVector,
    specs::{ServerSpec, WorkerSpec},
};
use log::info;
use parameter_server::{ParameterServer, ServerErr, ServerOutcome};
use tokio::{
    io,
    runtime::Runtime,
    task::JoinHandle,
};
use worker::{WorkerBuilder, WorkerDriver, WorkerErr};

use crate::error::OrchestratorError;

const CHANNEL_SIZE: usize = 1 << 16;

/// How a training run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// The amount of aggregated rounds.
    pub rounds: u64,
    /// The master's final parameters.
    pub global: ParameterVector,
    /// Every worker's id and final local parameters.
    pub workers: Vec<(String, ParameterVector)>,
}

/// Represents an ongoing training session that's running in the background.
///
/// The master and every worker run as their own tasks in the session's runtime,
/// connected through in-memory channels.
pub struct Session {
    runtime: Runtime,
    server: JoinHandle<Result<ServerOutcome, ServerErr>>,
    workers: Vec<(String, JoinHandle<Result<WorkerDriver, WorkerErr>>)>,
}

impl Session {
    /// Creates a new `Session`, setting up and spawning the master and every worker.
    ///
    /// # Arguments
    /// * `server_spec` - The specification of the master.
    /// * `worker_specs` - The specification of every worker.
    /// * `builder` - Builds the workers.
    ///
    /// # Errors
    /// The first setup error, nothing is spawned in that case.
    pub fn new(
        server_spec: &ServerSpec,
        worker_specs: &[WorkerSpec],
        builder: &WorkerBuilder,
    ) -> Result<Self, OrchestratorError> {
        let mut pserver = ParameterServer::new(server_spec)
            .map_err(|e| OrchestratorError::ServerError(e.to_string()))?;

        let workers = worker_specs
            .iter()
            .map(|spec| {
                builder
                    .build(spec)
                    .map(|worker| (spec.worker_id.clone(), worker))
                    .map_err(|e| OrchestratorError::WorkerError {
                        worker_id: spec.worker_id.clone(),
                        msg: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let runtime = Runtime::new()?;

        let (server, workers) = {
            let _guard = runtime.enter();

            let workers = workers
                .into_iter()
                .map(|(worker_id, worker)| {
                    let (master_end, worker_end) = io::duplex(CHANNEL_SIZE);

                    let (rx, tx) = io::split(master_end);
                    let (rx, tx) = comms::channel(rx, tx);
                    pserver.spawn(rx, tx);

                    let (rx, tx) = io::split(worker_end);
                    let (rx, tx) = comms::channel(rx, tx);
                    (worker_id, runtime.spawn(worker.run(rx, tx)))
                })
                .collect::<Vec<_>>();

            (runtime.spawn(pserver.run()), workers)
        };

        Ok(Self {
            runtime,
            server,
            workers,
        })
    }

    /// Waits until the entire training is finished.
    ///
    /// # Returns
    /// The final parameters of the master and of every worker.
    ///
    /// # Errors
    /// The error that made the run fail, a worker's own failure is preferred over the
    /// connection errors it causes elsewhere.
    pub fn wait(self) -> Result<TrainingOutcome, OrchestratorError> {
        let Self {
            runtime,
            server,
            workers,
        } = self;

        runtime.block_on(async move {
            let server = server.await.map_err(std::io::Error::from)?;

            let mut finished = Vec::with_capacity(workers.len());
            let mut failures = Vec::new();
            for (worker_id, handle) in workers {
                match handle.await.map_err(std::io::Error::from)? {
                    Ok(driver) => finished.push((worker_id, driver.params().clone())),
                    Err(e) => failures.push((worker_id, e)),
                }
            }

            let root_cause = failures
                .iter()
                .position(|(_, e)| !matches!(e, WorkerErr::Io(_)))
                .or(if server.is_ok() && !failures.is_empty() { Some(0) } else { None });

            if let Some(i) = root_cause {
                let (worker_id, e) = failures.swap_remove(i);
                return Err(OrchestratorError::WorkerError {
                    worker_id,
                    msg: e.to_string(),
                });
            }

            let outcome = server.map_err(|e| OrchestratorError::ServerError(e.to_string()))?;
            info!(rounds = outcome.rounds; "training finished");

            Ok(TrainingOutcome {
                rounds: outcome.rounds,
                global: outcome.global,
                workers: finished,
            })
        })
    }
}
