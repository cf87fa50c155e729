use std::{error::Error, fmt, io};

use comms::specs::SpecErr;
use machine_learning::MlErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Config(SpecErr),
    DimensionMismatch {
        round: u64,
        got: usize,
        expected: usize,
    },
    Ml(MlErr),
    Io(io::Error),
    UnexpectedMessage {
        round: u64,
        got: &'static str,
    },
    /// The master refused the worker.
    Rejected(String),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Config(e) => write!(f, "configuration error: {e}"),
            WorkerErr::DimensionMismatch {
                round,
                got,
                expected,
            } => write!(
                f,
                "parameters length mismatch at round {round}: got {got}, expected {expected}"
            ),
            WorkerErr::Ml(e) => write!(f, "training error: {e}"),
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::UnexpectedMessage { round, got } => {
                write!(f, "unexpected message at round {round}: got {got}")
            }
            WorkerErr::Rejected(detail) => write!(f, "rejected by the master: {detail}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Config(e) => Some(e),
            WorkerErr::Ml(e) => Some(e),
            WorkerErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpecErr> for WorkerErr {
    fn from(value: SpecErr) -> Self {
        Self::Config(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::Io(e) => Self::Io(e),
            other => Self::Ml(other),
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
