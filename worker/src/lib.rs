pub mod builder;
mod driver;
pub mod error;
mod worker;

pub use builder::WorkerBuilder;
pub use driver::{BatchReport, WorkerDriver};
pub use error::{Result, WorkerErr};
pub use worker::Worker;
