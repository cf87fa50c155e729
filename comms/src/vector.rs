use std::ops::{Deref, DerefMut};

/// A flat vector of model parameters whose length is fixed at construction.
///
/// Elements can be read and written through the slice views, but the vector
/// can never grow or shrink, every vector exchanged during a run shares the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector(Box<[f32]>);

impl ParameterVector {
    /// Creates a new `ParameterVector` filled with zeros.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters.
    pub fn zeros(len: usize) -> Self {
        Self::filled(0., len)
    }

    /// Creates a new `ParameterVector` where every parameter is `value`.
    ///
    /// # Arguments
    /// * `value` - The initial value of every parameter.
    /// * `len` - The amount of parameters.
    pub fn filled(value: f32, len: usize) -> Self {
        Self(vec![value; len].into_boxed_slice())
    }

    /// Returns the amount of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    /// Whether every parameter is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&p| p == 0.)
    }

    /// Bit-for-bit comparison, unlike `==` it tells `0.0` and `-0.0` apart and matches `NaN`s.
    pub fn bits_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0.into_vec()
    }
}

impl From<Vec<f32>> for ParameterVector {
    fn from(value: Vec<f32>) -> Self {
        Self(value.into_boxed_slice())
    }
}

impl From<&[f32]> for ParameterVector {
    fn from(value: &[f32]) -> Self {
        Self(Box::from(value))
    }
}

impl Deref for ParameterVector {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ParameterVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
