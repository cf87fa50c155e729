use std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};

use comms::{GlobalUpdate, GradientQueue, GradientUpdate, ParameterVector, specs::ServerSpec};
use log::{debug, info};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{Result, ServerErr};

/// Where the master stands within the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Still waiting for some workers to report `round`.
    Collecting { round: u64, received: usize },
    /// Every expected worker reported `round`, it can be aggregated.
    Ready { round: u64 },
}

/// What went into an aggregated round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: u64,
    pub workers: usize,
    /// The amount of records the workers trained on during the round.
    pub records: u64,
}

struct State {
    global: ParameterVector,
    round: u64,
    pending: BTreeMap<String, GradientUpdate>,
    latest: Option<Arc<GlobalUpdate>>,
}

/// The synchronous master, it owns the global parameter vector.
///
/// Workers' updates are pushed onto a queue from any thread and later folded into the
/// round buffer one at a time. Once every expected worker reported, the round is aggregated
/// as the unweighted mean of the deltas, summed in ascending worker id order so the result
/// doesn't depend on the order in which updates arrived.
pub struct MasterDriver {
    params: usize,
    workers: NonZeroUsize,
    queue: GradientQueue,
    state: Mutex<State>,
}

impl MasterDriver {
    /// Creates a new `MasterDriver` following `spec`.
    ///
    /// # Errors
    /// `ServerErr::Config` if the spec is invalid.
    pub fn setup(spec: &ServerSpec) -> Result<Self> {
        let params = spec.model.params()?;
        let workers = spec.workers()?;
        spec.rounds()?;

        info!(
            params = params,
            workers = workers.get(),
            rounds = spec.rounds;
            "master set up"
        );

        Ok(Self {
            params,
            workers,
            queue: GradientQueue::new(),
            state: Mutex::new(State {
                global: ParameterVector::filled(spec.model.initial_value, params),
                round: 0,
                pending: BTreeMap::new(),
                latest: None,
            }),
        })
    }

    /// The length of every parameter vector of the run.
    pub fn params(&self) -> usize {
        self.params
    }

    /// The amount of workers expected every round.
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// The round currently being collected.
    pub fn round(&self) -> u64 {
        self.state.lock().round
    }

    /// A copy of the global parameter vector.
    pub fn global(&self) -> ParameterVector {
        self.state.lock().global.clone()
    }

    /// Where the current round stands.
    pub fn phase(&self) -> Phase {
        Self::phase_of(&self.state.lock(), self.workers)
    }

    /// The amount of records behind the updates folded so far in the current round.
    pub fn pending_records(&self) -> u64 {
        let state = self.state.lock();
        state.pending.values().map(|u| u.observed_batch_size).sum()
    }

    /// Enqueues a worker's update, it will be validated once received.
    pub fn add_incoming_gradient_message_to_queue(&self, msg: GradientUpdate) {
        debug!(worker_id = msg.worker_id.as_str(), round = msg.round_id; "queued gradient");
        self.queue.push(msg);
    }

    /// Pops the oldest queued update and folds it into the current round.
    ///
    /// # Returns
    /// The phase after folding the update.
    ///
    /// # Errors
    /// `ServerErr::QueueUnderflow` if the queue is empty, or a validation error in which case
    /// the update is dropped and the round is left as it was.
    pub fn recv_gradient_message(&self) -> Result<Phase> {
        let msg = self.queue.try_pop().ok_or(ServerErr::QueueUnderflow)?;
        self.fold(msg)
    }

    /// Like `recv_gradient_message` but waits for an update instead of underflowing.
    ///
    /// # Errors
    /// `ServerErr::QueueClosed` if the queue was closed and drained.
    pub async fn recv_gradient_message_blocking(&self) -> Result<Phase> {
        let msg = self.queue.pop().await.ok_or(ServerErr::QueueClosed)?;
        self.fold(msg)
    }

    /// Closes the gradient queue, waiting receivers fail once it's drained.
    pub fn close(&self) {
        self.queue.close();
    }

    /// Aggregates the current round into the global vector and prepares its broadcast.
    ///
    /// # Errors
    /// `ServerErr::IncompleteRound` if not every expected worker reported, in which case the
    /// global vector is left untouched.
    pub fn generate_global_update_vector(&self) -> Result<RoundSummary> {
        let mut state = self.state.lock();
        let State {
            global,
            round,
            pending,
            latest,
        } = &mut *state;

        let expected = self.workers.get();
        if pending.len() != expected {
            return Err(ServerErr::IncompleteRound {
                round: *round,
                got: pending.len(),
                expected,
            });
        }

        let deltas: Vec<&[f32]> = pending.values().map(|u| u.delta.as_slice()).collect();
        let n = expected as f32;

        global.as_mut_slice().par_iter_mut().enumerate().for_each(|(i, g)| {
            let sum: f32 = deltas.iter().map(|d| d[i]).sum();
            *g += sum / n;
        });

        let summary = RoundSummary {
            round: *round,
            workers: expected,
            records: pending.values().map(|u| u.observed_batch_size).sum(),
        };

        pending.clear();
        *latest = Some(Arc::new(GlobalUpdate::new(global.clone(), *round)));
        *round += 1;

        info!(round = summary.round, records = summary.records; "round aggregated");
        Ok(summary)
    }

    /// Returns the snapshot of the last aggregated round, shared by every worker.
    ///
    /// # Errors
    /// `ServerErr::NothingToBroadcast` if no round was aggregated yet.
    pub fn get_next_global_update_msg_from_queue(&self) -> Result<Arc<GlobalUpdate>> {
        self.state
            .lock()
            .latest
            .clone()
            .ok_or(ServerErr::NothingToBroadcast)
    }

    fn fold(&self, msg: GradientUpdate) -> Result<Phase> {
        let mut state = self.state.lock();

        if msg.delta.len() != self.params {
            return Err(ServerErr::DimensionMismatch {
                got: msg.delta.len(),
                expected: self.params,
            });
        }

        if msg.round_id != state.round {
            return Err(ServerErr::RoundMismatch {
                worker_id: msg.worker_id,
                got: msg.round_id,
                expected: state.round,
            });
        }

        if state.pending.contains_key(&msg.worker_id) {
            return Err(ServerErr::DuplicateUpdate {
                worker_id: msg.worker_id,
                round: state.round,
            });
        }

        if state.pending.len() >= self.workers.get() {
            return Err(ServerErr::UnexpectedWorker {
                worker_id: msg.worker_id,
                expected: self.workers.get(),
            });
        }

        debug!(
            worker_id = msg.worker_id.as_str(),
            round = msg.round_id,
            records = msg.observed_batch_size;
            "received gradient"
        );

        state.pending.insert(msg.worker_id.clone(), msg);
        Ok(Self::phase_of(&state, self.workers))
    }

    fn phase_of(state: &State, workers: NonZeroUsize) -> Phase {
        if state.pending.len() == workers.get() {
            Phase::Ready { round: state.round }
        } else {
            Phase::Collecting {
                round: state.round,
                received: state.pending.len(),
            }
        }
    }
}
