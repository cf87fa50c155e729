use serde::{Deserialize, Serialize};

use super::{Result, SpecErr};

/// The shape of the linear model shared by the master and every worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub feature_vector_size: usize,
    pub num_categories: usize,
    /// The value every parameter starts at.
    #[serde(default)]
    pub initial_value: f32,
}

impl ModelSpec {
    /// Creates a new zero-initialized `ModelSpec`.
    pub fn new(feature_vector_size: usize, num_categories: usize) -> Self {
        Self {
            feature_vector_size,
            num_categories,
            initial_value: 0.,
        }
    }

    /// Validates the spec and derives the length of the parameter vector.
    ///
    /// # Returns
    /// `feature_vector_size * num_categories`, or a `SpecErr` if either is zero,
    /// the product overflows or the initial value isn't finite.
    pub fn params(&self) -> Result<usize> {
        if self.feature_vector_size == 0 {
            return Err(SpecErr::not_positive("feature_vector_size"));
        }

        if self.num_categories == 0 {
            return Err(SpecErr::not_positive("num_categories"));
        }

        if !self.initial_value.is_finite() {
            return Err(SpecErr::new("`initial_value` must be finite"));
        }

        self.feature_vector_size
            .checked_mul(self.num_categories)
            .ok_or_else(|| {
                SpecErr::new(format!(
                    "a model of {} features and {} categories doesn't fit in memory",
                    self.feature_vector_size, self.num_categories
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_is_features_times_categories() {
        assert_eq!(ModelSpec::new(10_000, 20).params(), Ok(200_000));
        assert_eq!(ModelSpec::new(1, 1).params(), Ok(1));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(ModelSpec::new(0, 20).params().is_err());
        assert!(ModelSpec::new(10, 0).params().is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(ModelSpec::new(usize::MAX, 2).params().is_err());
    }

    #[test]
    fn initial_value_defaults_to_zero() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"feature_vector_size":3,"num_categories":2}"#).unwrap();
        assert_eq!(spec, ModelSpec::new(3, 2));
    }

    #[test]
    fn missing_field_fails_to_parse() {
        let res = serde_json::from_str::<ModelSpec>(r#"{"feature_vector_size":3}"#);
        assert!(res.is_err());
    }
}
