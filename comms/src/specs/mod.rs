mod error;
mod load;
mod model;
mod server;
mod worker;

pub use error::{Result, SpecErr};
pub use load::{from_json, from_path};
pub use model::ModelSpec;
pub use server::ServerSpec;
pub use worker::{DEFAULT_LEARNING_RATE, EndOfData, SplitSpec, WorkerSpec};
