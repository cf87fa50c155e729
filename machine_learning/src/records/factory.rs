use comms::specs::ModelSpec;

use crate::{MlErr, Result};

/// The dimensions every parsed record must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub features: usize,
    pub categories: usize,
}

impl Schema {
    pub fn new(features: usize, categories: usize) -> Self {
        Self {
            features,
            categories,
        }
    }

    /// Checks that `record` fits in this schema.
    pub fn check(&self, record: &Record) -> Result<()> {
        if record.label >= self.categories {
            return Err(MlErr::LabelOutOfRange {
                label: record.label,
                categories: self.categories,
            });
        }

        if let Some(&(index, _)) = record.features.iter().find(|(i, _)| *i >= self.features) {
            return Err(MlErr::FeatureOutOfRange {
                index,
                features: self.features,
            });
        }

        Ok(())
    }
}

impl From<&ModelSpec> for Schema {
    fn from(spec: &ModelSpec) -> Self {
        Self::new(spec.feature_vector_size, spec.num_categories)
    }
}

/// A labeled feature vector in sparse form.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// `(index, value)` pairs, absent indices are zero.
    pub features: Vec<(usize, f32)>,
    pub label: usize,
}

impl Record {
    pub fn new(features: Vec<(usize, f32)>, label: usize) -> Self {
        Self { features, label }
    }
}

/// Converts raw records into labeled feature vectors.
pub trait RecordFactory: Send {
    /// Parses a single raw record.
    ///
    /// # Arguments
    /// * `raw` - One record as read from an input split, without its line terminator.
    ///
    /// # Returns
    /// The parsed record, which always fits the factory's schema, or a record error.
    fn parse(&self, raw: &str) -> Result<Record>;
}
