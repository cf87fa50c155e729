use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::{ModelSpec, Result, SpecErr};

/// The specification of the master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    /// How many distinct workers report every round.
    pub workers: usize,
    /// The maximum amount of rounds to run.
    pub rounds: usize,
    pub model: ModelSpec,
}

impl ServerSpec {
    /// Returns the expected amount of workers per round.
    pub fn workers(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.workers).ok_or_else(|| SpecErr::not_positive("workers"))
    }

    /// Returns the maximum amount of rounds.
    pub fn rounds(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.rounds).ok_or_else(|| SpecErr::not_positive("rounds"))
    }
}
