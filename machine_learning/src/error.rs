use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnknownRecordFactory {
        id: String,
        known: Vec<String>,
    },
    MalformedRecord(String),
    LabelOutOfRange {
        label: usize,
        categories: usize,
    },
    FeatureOutOfRange {
        index: usize,
        features: usize,
    },
    Io(io::Error),
}

impl MlErr {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Whether the error only concerns a single record, the record can be skipped and training continue.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            MlErr::MalformedRecord(_)
                | MlErr::LabelOutOfRange { .. }
                | MlErr::FeatureOutOfRange { .. }
        )
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch in {what}, got {got} and expected {expected}"),
            MlErr::UnknownRecordFactory { id, known } => write!(
                f,
                "unknown record factory `{id}`, known factories are: {}",
                known.join(", ")
            ),
            MlErr::MalformedRecord(msg) => write!(f, "malformed record: {msg}"),
            MlErr::LabelOutOfRange { label, categories } => {
                write!(f, "label {label} is out of range for {categories} categories")
            }
            MlErr::FeatureOutOfRange { index, features } => {
                write!(f, "feature index {index} is out of range for {features} features")
            }
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
