use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type for specification validation.
pub type Result<T> = std::result::Result<T, SpecErr>;

/// Error returned whenever a specification is missing a required value or holds
/// an inconsistent one, it is always raised before any training starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecErr(String);

impl SpecErr {
    /// Creates a new `SpecErr`.
    ///
    /// # Arguments
    /// * `msg` - What's wrong with the specification.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Creates the error for a numeric field that must be strictly positive.
    pub(crate) fn not_positive(field: &str) -> Self {
        Self(format!("`{field}` must be greater than zero"))
    }
}

impl Display for SpecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for SpecErr {}
