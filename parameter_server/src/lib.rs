mod error;
mod master;
mod service;

pub use error::{Result, ServerErr};
pub use master::{MasterDriver, Phase, RoundSummary};
pub use service::{ParameterServer, ServerOutcome};
