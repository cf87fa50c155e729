use std::fmt;

use comms::specs::SpecErr;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before anything runs.
    InvalidConfig(String),
    /// A worker produced an unrecoverable error during training.
    WorkerError { worker_id: String, msg: String },
    /// The parameter server produced an unrecoverable error.
    ServerError(String),
    /// An underlying I/O error not covered by the above variants.
    Io(std::io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::WorkerError { worker_id, msg } => {
                write!(f, "worker {worker_id} error: {msg}")
            }
            Self::ServerError(msg) => write!(f, "server error: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SpecErr> for OrchestratorError {
    fn from(e: SpecErr) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
