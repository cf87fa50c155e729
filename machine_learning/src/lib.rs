pub mod data;
pub mod error;
mod model;
pub mod records;

pub use error::{MlErr, Result};
pub use model::LocalModel;
pub use records::{Record, RecordFactory, RecordFactoryRegistry, Schema};
