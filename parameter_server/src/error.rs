use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use comms::specs::SpecErr;

/// The result type used in the entire parameter server module.
pub type Result<T> = std::result::Result<T, ServerErr>;

/// The parameter server module's error type.
#[derive(Debug)]
pub enum ServerErr {
    Config(SpecErr),
    DimensionMismatch {
        got: usize,
        expected: usize,
    },
    /// A non-blocking receive found the gradient queue empty.
    QueueUnderflow,
    IncompleteRound {
        round: u64,
        got: usize,
        expected: usize,
    },
    /// A gradient tagged for a round other than the one being collected.
    RoundMismatch {
        worker_id: String,
        got: u64,
        expected: u64,
    },
    DuplicateUpdate {
        worker_id: String,
        round: u64,
    },
    UnexpectedWorker {
        worker_id: String,
        expected: usize,
    },
    NothingToBroadcast,
    QueueClosed,
    UnexpectedMessage {
        round: u64,
        got: &'static str,
    },
    Io(io::Error),
}

impl Display for ServerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerErr::Config(e) => write!(f, "configuration error: {e}"),
            ServerErr::DimensionMismatch { got, expected } => {
                write!(f, "dimension mismatch: got {got} parameters, expected {expected}")
            }
            ServerErr::QueueUnderflow => f.write_str("the gradient queue is empty"),
            ServerErr::IncompleteRound {
                round,
                got,
                expected,
            } => write!(
                f,
                "round {round} is incomplete: received {got} out of {expected} updates"
            ),
            ServerErr::RoundMismatch {
                worker_id,
                got,
                expected,
            } => write!(
                f,
                "worker {worker_id} sent an update for round {got} while collecting round {expected}"
            ),
            ServerErr::DuplicateUpdate { worker_id, round } => {
                write!(f, "worker {worker_id} already sent its update for round {round}")
            }
            ServerErr::UnexpectedWorker {
                worker_id,
                expected,
            } => write!(
                f,
                "unexpected worker {worker_id}, the round already holds {expected} workers"
            ),
            ServerErr::NothingToBroadcast => f.write_str("no round has been aggregated yet"),
            ServerErr::QueueClosed => f.write_str("the gradient queue was closed"),
            ServerErr::UnexpectedMessage { round, got } => {
                write!(f, "unexpected message at round {round}: {got}")
            }
            ServerErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for ServerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServerErr::Config(e) => Some(e),
            ServerErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpecErr> for ServerErr {
    fn from(value: SpecErr) -> Self {
        Self::Config(value)
    }
}

impl From<io::Error> for ServerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
