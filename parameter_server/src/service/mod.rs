mod pserver;

pub use pserver::{ParameterServer, ServerOutcome};
