use std::mem;

use comms::ParameterVector;
use ndarray::prelude::*;

use crate::{MlErr, Record, Result, Schema};

/// An online multinomial logistic regression.
///
/// The parameters are laid out as one contiguous block of `features` weights per category,
/// weight `(k, j)` lives at index `k * features + j`. Every training step is applied to the
/// working parameters and accumulated into the delta, so that `params - delta` is always the
/// last vector received from the master.
#[derive(Debug, Clone)]
pub struct LocalModel {
    schema: Schema,
    params: ParameterVector,
    delta: ParameterVector,
    learning_rate: f32,
}

impl LocalModel {
    /// Creates a new `LocalModel`.
    ///
    /// # Arguments
    /// * `schema` - The amount of features and categories of the model.
    /// * `initial` - The value every parameter starts at.
    /// * `learning_rate` - The step size of every training step.
    pub fn new(schema: Schema, initial: f32, learning_rate: f32) -> Self {
        let len = schema.features * schema.categories;

        Self {
            schema,
            params: ParameterVector::filled(initial, len),
            delta: ParameterVector::zeros(len),
            learning_rate,
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// The working parameters.
    pub fn params(&self) -> &ParameterVector {
        &self.params
    }

    /// The change accumulated since the last `take_delta` or `apply_global`.
    pub fn delta(&self) -> &ParameterVector {
        &self.delta
    }

    /// Computes the probability of every category for `record`.
    ///
    /// # Returns
    /// A probability per category, summing up to one.
    pub fn classify(&self, record: &Record) -> Result<Vec<f32>> {
        self.schema.check(record)?;

        let mut probs = self.scores(record)?;
        softmax(&mut probs);
        Ok(probs)
    }

    /// Returns the most likely category of `record`.
    pub fn predict(&self, record: &Record) -> Result<usize> {
        let probs = self.classify(record)?;

        let (category, _) = probs
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (k, &p)| if p > best.1 { (k, p) } else { best });

        Ok(category)
    }

    /// Performs a single stochastic gradient descent step on `record`.
    ///
    /// The record is validated before any parameter is written.
    ///
    /// # Returns
    /// The cross-entropy loss of the record before the step.
    pub fn train(&mut self, record: &Record) -> Result<f32> {
        self.schema.check(record)?;

        let mut probs = self.scores(record)?;
        let target = probs[record.label];
        let loss = softmax(&mut probs) - target;

        let shape = self.shape();
        let mut params = view_mut(&mut self.params, shape)?;
        let mut delta = view_mut(&mut self.delta, shape)?;

        for (k, p) in probs.into_iter().enumerate() {
            let indicator = if k == record.label { 1. } else { 0. };
            let g = self.learning_rate * (indicator - p);

            let mut w = params.row_mut(k);
            let mut d = delta.row_mut(k);
            for &(j, x) in &record.features {
                w[j] += g * x;
                d[j] += g * x;
            }
        }

        Ok(loss)
    }

    /// Takes the accumulated delta, leaving a zeroed one in its place.
    pub fn take_delta(&mut self) -> ParameterVector {
        let len = self.delta.len();
        mem::replace(&mut self.delta, ParameterVector::zeros(len))
    }

    /// Overwrites the working parameters with `global` and clears the delta.
    ///
    /// # Errors
    /// `MlErr::SizeMismatch` if the lengths differ, in which case nothing is written.
    pub fn apply_global(&mut self, global: &ParameterVector) -> Result<()> {
        if global.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "global parameters",
                got: global.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(global);
        self.delta.fill(0.);
        Ok(())
    }

    fn shape(&self) -> (usize, usize) {
        (self.schema.categories, self.schema.features)
    }

    fn scores(&self, record: &Record) -> Result<Vec<f32>> {
        let weights = view(&self.params, self.shape())?;

        let scores = weights
            .outer_iter()
            .map(|w| record.features.iter().map(|&(j, x)| w[j] * x).sum::<f32>())
            .collect();

        Ok(scores)
    }
}

fn size_mismatch(got: usize, (rows, cols): (usize, usize)) -> MlErr {
    MlErr::SizeMismatch {
        what: "parameters",
        got,
        expected: rows * cols,
    }
}

fn view(params: &[f32], shape: (usize, usize)) -> Result<ArrayView2<'_, f32>> {
    ArrayView2::from_shape(shape, params).map_err(|_| size_mismatch(params.len(), shape))
}

fn view_mut(params: &mut [f32], shape: (usize, usize)) -> Result<ArrayViewMut2<'_, f32>> {
    let len = params.len();
    ArrayViewMut2::from_shape(shape, params).map_err(|_| size_mismatch(len, shape))
}

/// Turns `scores` into probabilities in place.
///
/// # Returns
/// The log of the sum of the exponentiated scores.
fn softmax(scores: &mut [f32]) -> f32 {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }

    scores.iter_mut().for_each(|s| *s /= sum);
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn model() -> LocalModel {
        LocalModel::new(Schema::new(3, 2), 0., 0.5)
    }

    #[test]
    fn uniform_model_is_uncertain() {
        let model = model();
        let record = Record::new(vec![(0, 1.), (2, 4.)], 1);

        let probs = model.classify(&record).unwrap();
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn training_moves_towards_the_label() {
        let mut model = model();
        let record = Record::new(vec![(0, 1.), (1, 2.)], 1);

        let first = model.train(&record).unwrap();
        assert!((first - 2f32.ln()).abs() < 1e-6);

        // g = 0.5 * (1 - 0.5) for the label and the opposite for the other category
        assert_eq!(&model.params()[..], &[-0.25, -0.5, 0., 0.25, 0.5, 0.]);

        let second = model.train(&record).unwrap();
        assert!(second < first);
        assert_eq!(model.predict(&record).unwrap(), 1);
    }

    #[test]
    fn delta_tracks_every_step() {
        let mut model = LocalModel::new(Schema::new(2, 3), 0.25, 0.1);
        let records = [
            Record::new(vec![(0, 1.)], 0),
            Record::new(vec![(1, -1.)], 2),
            Record::new(vec![(0, 0.5), (1, 0.5)], 1),
        ];

        for record in &records {
            model.train(record).unwrap();
        }

        for (p, d) in model.params().iter().zip(model.delta().iter()) {
            assert!((p - 0.25 - d).abs() < 1e-6);
        }
    }

    #[test]
    fn taking_the_delta_twice_yields_zero() {
        let mut model = model();
        model.train(&Record::new(vec![(1, 1.)], 0)).unwrap();

        assert!(!model.take_delta().is_zero());
        assert!(model.take_delta().is_zero());
    }

    #[test]
    fn invalid_records_leave_the_model_untouched() {
        let mut model = model();

        let err = model.train(&Record::new(vec![(0, 1.)], 2)).unwrap_err();
        assert!(matches!(err, MlErr::LabelOutOfRange { .. }));

        let err = model.train(&Record::new(vec![(3, 1.)], 0)).unwrap_err();
        assert!(matches!(err, MlErr::FeatureOutOfRange { .. }));

        assert!(model.params().is_zero());
        assert!(model.delta().is_zero());
    }

    #[test]
    fn apply_global_overwrites_and_clears() {
        let mut model = model();
        model.train(&Record::new(vec![(0, 1.)], 0)).unwrap();

        let global = ParameterVector::from(vec![1., 2., 3., 4., 5., 6.]);
        model.apply_global(&global).unwrap();

        assert!(model.params().bits_eq(&global));
        assert!(model.delta().is_zero());
    }

    #[test]
    fn apply_global_rejects_other_lengths() {
        let mut model = model();
        model.train(&Record::new(vec![(0, 1.)], 0)).unwrap();
        let before = model.clone();

        let err = model.apply_global(&ParameterVector::zeros(5)).unwrap_err();
        assert!(matches!(
            err,
            MlErr::SizeMismatch {
                got: 5,
                expected: 6,
                ..
            }
        ));
        assert!(model.params().bits_eq(before.params()));
        assert!(model.delta().bits_eq(before.delta()));
    }

    #[test]
    fn learns_a_separable_problem() {
        fn sample(rng: &mut StdRng) -> Record {
            let x0 = rng.random_range(-1f32..1.);
            let x1 = rng.random_range(-1f32..1.);
            let label = usize::from(x0 + x1 > 0.);
            Record::new(vec![(0, 1.), (1, x0), (2, x1)], label)
        }

        let mut rng = StdRng::seed_from_u64(42);
        let mut model = LocalModel::new(Schema::new(3, 2), 0., 0.5);

        for _ in 0..2_000 {
            model.train(&sample(&mut rng)).unwrap();
        }

        let correct = (0..200)
            .map(|_| sample(&mut rng))
            .filter(|record| model.predict(record).unwrap() == record.label)
            .count();
        assert!(correct > 180, "{correct} out of 200");
    }
}
