use std::{fs, path::Path};

use serde::de::DeserializeOwned;

use super::{Result, SpecErr};

/// Reads a JSON specification from `path`.
///
/// # Errors
/// A `SpecErr` if the file can't be read or doesn't hold a valid `T`.
pub fn from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|e| SpecErr::new(format!("failed to read {}: {e}", path.display())))?;

    from_json(&raw).map_err(|e| SpecErr::new(format!("{}: {e}", path.display())))
}

/// Parses a JSON specification.
pub fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| SpecErr::new(format!("invalid specification: {e}")))
}
