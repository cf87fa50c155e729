mod csv;
mod factory;
mod hashing;
mod libsvm;
mod newsgroups;
mod registry;

pub use csv::CsvRecordFactory;
pub use factory::{Record, RecordFactory, Schema};
pub use libsvm::LibsvmRecordFactory;
pub use newsgroups::{NEWSGROUPS, TwentyNewsgroupsRecordFactory};
pub use registry::{CSV, FactoryCtor, LIBSVM, RecordFactoryRegistry, TWENTY_NEWSGROUPS};
