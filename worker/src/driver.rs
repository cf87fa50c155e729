use std::{fmt, mem, num::NonZeroUsize};

use comms::{
    GlobalUpdate, GradientUpdate, ParameterVector,
    specs::{EndOfData, SpecErr, WorkerSpec},
};
use log::{debug, info, warn};
use machine_learning::{
    LocalModel, RecordFactory, RecordFactoryRegistry, Schema,
    data::{self, RecordReader, SplitSource},
};

use crate::{Result, WorkerErr};

/// What happened while training a single batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// The amount of records trained on.
    pub records: usize,
    /// The amount of malformed records left out.
    pub skipped: usize,
    /// The mean cross-entropy loss of the trained records, `None` if there were none.
    pub mean_loss: Option<f32>,
    /// Whether the split was reopened from its start during the batch.
    pub wrapped: bool,
    /// Whether the split has no more records to give.
    pub exhausted: bool,
}

/// The synchronous worker, it trains a local model on its split and exchanges
/// parameters with the master one round at a time.
pub struct WorkerDriver {
    worker_id: String,
    batch_size: NonZeroUsize,
    end_of_data: EndOfData,
    model: LocalModel,
    factory: Box<dyn RecordFactory>,
    source: Box<dyn SplitSource>,
    reader: Box<dyn RecordReader>,
    exhausted: bool,
    trained_since_open: u64,
    trained_since_update: u64,
    round: u64,
}

impl fmt::Debug for WorkerDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerDriver")
            .field("worker_id", &self.worker_id)
            .field("batch_size", &self.batch_size)
            .field("end_of_data", &self.end_of_data)
            .field("source", &self.source)
            .field("exhausted", &self.exhausted)
            .field("round", &self.round)
            .finish_non_exhaustive()
    }
}

impl WorkerDriver {
    /// Creates a new `WorkerDriver` reading the split described by `spec`.
    ///
    /// # Errors
    /// `WorkerErr::Config` if the spec is invalid or names an unknown record factory,
    /// `WorkerErr::Io` if the split can't be opened.
    pub fn setup(spec: &WorkerSpec, registry: &RecordFactoryRegistry) -> Result<Self> {
        spec.split.validate()?;
        Self::with_source(spec, data::from_spec(&spec.split), registry)
    }

    /// Like `setup` but reads from the given `source` instead of `spec.split`.
    pub fn with_source(
        spec: &WorkerSpec,
        source: Box<dyn SplitSource>,
        registry: &RecordFactoryRegistry,
    ) -> Result<Self> {
        let (params, batch_size) = spec.validate()?;
        let schema = Schema::from(&spec.model);

        let factory = registry
            .resolve(&spec.record_factory, schema)
            .map_err(|e| WorkerErr::Config(SpecErr::new(e.to_string())))?;

        if let Some(len) = source.len_hint().filter(|&len| len < batch_size.get()) {
            warn!(
                "split smaller than a batch: worker_id={} records={len} batch_size={batch_size}",
                spec.worker_id
            );
        }

        let reader = source.open()?;

        info!(
            worker_id = spec.worker_id.as_str(),
            params = params,
            batch_size = batch_size.get();
            "worker set up reading {}",
            source.describe()
        );

        Ok(Self {
            worker_id: spec.worker_id.clone(),
            batch_size,
            end_of_data: spec.end_of_data,
            model: LocalModel::new(schema, spec.model.initial_value, spec.learning_rate),
            factory,
            source,
            reader,
            exhausted: false,
            trained_since_open: 0,
            trained_since_update: 0,
            round: 0,
        })
    }

    /// The id this worker reports its updates under.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// The round this worker is training for.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// The local parameter vector.
    pub fn params(&self) -> &ParameterVector {
        self.model.params()
    }

    /// The local model, for inference on the current parameters.
    pub fn model(&self) -> &LocalModel {
        &self.model
    }

    /// Whether the split has run out for good, later batches are empty.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Trains on up to `batch_size` records of the split.
    ///
    /// # Errors
    /// Io errors of the split, malformed records are skipped instead.
    pub fn run_next_training_batch(&mut self) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut total_loss = 0f64;

        while report.records < self.batch_size.get() {
            let Some(raw) = self.next_raw(&mut report)? else {
                break;
            };

            let res = self
                .factory
                .parse(&raw)
                .and_then(|record| self.model.train(&record));

            match res {
                Ok(loss) => {
                    report.records += 1;
                    self.trained_since_open += 1;
                    total_loss += loss as f64;
                }
                Err(e) if e.is_record_error() => {
                    report.skipped += 1;
                    warn!("skipping record: worker_id={} {e}", self.worker_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.trained_since_update += report.records as u64;

        if report.records > 0 {
            report.mean_loss = Some((total_loss / report.records as f64) as f32);
        }
        report.exhausted = self.exhausted;

        debug!(
            worker_id = self.worker_id.as_str(),
            round = self.round,
            records = report.records,
            skipped = report.skipped;
            "trained batch"
        );

        Ok(report)
    }

    /// Packages the delta accumulated since the last update or broadcast, and resets it.
    pub fn generate_update_message(&mut self) -> GradientUpdate {
        let delta = self.model.take_delta();
        let records = mem::take(&mut self.trained_since_update);

        GradientUpdate::new(self.worker_id.clone(), delta, records, self.round)
    }

    /// Replaces the local parameters with the master's and moves on to the next round.
    ///
    /// # Errors
    /// `WorkerErr::DimensionMismatch` if the lengths differ, the local state is left untouched.
    pub fn process_incoming_parameter_vector_message(&mut self, msg: &GlobalUpdate) -> Result<()> {
        let expected = self.model.params().len();
        if msg.vector.len() != expected {
            return Err(WorkerErr::DimensionMismatch {
                round: self.round,
                got: msg.vector.len(),
                expected,
            });
        }

        self.model.apply_global(&msg.vector)?;
        self.round = msg.round_id + 1;
        Ok(())
    }

    /// Reads the next raw record, applying the end of data policy when the split runs out.
    fn next_raw(&mut self, report: &mut BatchReport) -> Result<Option<String>> {
        loop {
            if self.exhausted {
                return Ok(None);
            }

            if let Some(raw) = self.reader.read_next()? {
                return Ok(Some(raw));
            }

            match self.end_of_data {
                EndOfData::Stop => {
                    info!("split exhausted: worker_id={}", self.worker_id);
                    self.exhausted = true;
                }
                EndOfData::Wrap if self.trained_since_open == 0 => {
                    warn!(
                        "split has no usable records, stopping: worker_id={}",
                        self.worker_id
                    );
                    self.exhausted = true;
                }
                EndOfData::Wrap => {
                    debug!("wrapping split: worker_id={}", self.worker_id);
                    self.reader = self.source.open()?;
                    self.trained_since_open = 0;
                    report.wrapped = true;
                }
            }
        }
    }
}
