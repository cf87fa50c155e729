use crate::ParameterVector;

/// The change a worker computed locally since it last applied a global update.
///
/// Created by a worker at the end of a round and consumed exactly once by the master.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientUpdate {
    pub worker_id: String,
    pub delta: ParameterVector,
    pub observed_batch_size: u64,
    pub round_id: u64,
}

impl GradientUpdate {
    /// Creates a new `GradientUpdate`.
    ///
    /// # Arguments
    /// * `worker_id` - The id of the worker that produced the delta.
    /// * `delta` - The accumulated change of the local parameters.
    /// * `observed_batch_size` - The amount of records trained to produce `delta`.
    /// * `round_id` - The round this update belongs to.
    pub fn new(
        worker_id: impl Into<String>,
        delta: ParameterVector,
        observed_batch_size: u64,
        round_id: u64,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            delta,
            observed_batch_size,
            round_id,
        }
    }
}

/// The master's authoritative parameters after aggregating round `round_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalUpdate {
    pub vector: ParameterVector,
    pub round_id: u64,
}

impl GlobalUpdate {
    /// Creates a new `GlobalUpdate`.
    ///
    /// # Arguments
    /// * `vector` - A snapshot of the global parameters.
    /// * `round_id` - The round that produced `vector`.
    pub fn new(vector: ParameterVector, round_id: u64) -> Self {
        Self { vector, round_id }
    }
}
