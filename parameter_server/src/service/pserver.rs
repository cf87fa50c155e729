use std::{borrow::Cow, io, num::NonZeroUsize, pin::pin, sync::Arc};

use comms::{
    BroadcastQueue, BroadcastReceiver, GlobalUpdate, OnoReceiver, OnoSender, ParameterVector,
    msg::{Command, Msg, Payload},
    specs::{ServerSpec, SpecErr},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};

use crate::{MasterDriver, Result, ServerErr};

/// How a training run ended on the master's side.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerOutcome {
    /// The amount of aggregated rounds.
    pub rounds: u64,
    pub global: ParameterVector,
}

/// The central server structure, it handles task management and io between workers.
///
/// Every bound worker gets its own connection task, which feeds the worker's gradients into
/// the `MasterDriver`'s queue and forwards every broadcast back to it. The round loop in `run`
/// drains one gradient per worker, aggregates and publishes the new snapshot.
pub struct ParameterServer {
    driver: Arc<MasterDriver>,
    broadcast: BroadcastQueue<GlobalUpdate>,
    rounds: NonZeroUsize,
    tasks: JoinSet<Result<()>>,
}

impl ParameterServer {
    /// Creates a new `ParameterServer`.
    ///
    /// # Errors
    /// `ServerErr::Config` if the spec is invalid.
    pub fn new(spec: &ServerSpec) -> Result<Self> {
        Ok(Self {
            driver: Arc::new(MasterDriver::setup(spec)?),
            broadcast: BroadcastQueue::new(2),
            rounds: spec.rounds()?,
            tasks: JoinSet::new(),
        })
    }

    /// The driver behind this server.
    pub fn driver(&self) -> &MasterDriver {
        &self.driver
    }

    /// Binds a new worker to this server and spawns its connection task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let connection = Connection {
            driver: Arc::clone(&self.driver),
            updates: self.broadcast.subscribe(),
            rounds: self.rounds.get(),
            rx,
            tx,
        };

        self.tasks.spawn(connection.run());
    }

    /// Runs the training until the last round or until every worker runs out of data.
    ///
    /// # Returns
    /// The amount of aggregated rounds and the final global vector.
    ///
    /// # Errors
    /// The first error raised by either the round loop or a connection.
    pub async fn run(mut self) -> Result<ServerOutcome> {
        let workers = self.driver.workers().get();
        if self.tasks.len() != workers {
            return Err(ServerErr::Config(SpecErr::new(format!(
                "expected {workers} workers, {} are bound",
                self.tasks.len()
            ))));
        }

        let driver = Arc::clone(&self.driver);
        let mut rounds = pin!(round_loop(driver, self.broadcast, self.rounds.get()));
        let mut finished = false;

        while !(finished && self.tasks.is_empty()) {
            tokio::select! {
                res = &mut rounds, if !finished => {
                    res?;
                    finished = true;
                }
                Some(res) = self.tasks.join_next() => res.map_err(io::Error::from)??,
            }
        }

        Ok(ServerOutcome {
            rounds: self.driver.round(),
            global: self.driver.global(),
        })
    }
}

/// Collects, aggregates and publishes rounds, the broadcast is dropped on return so the
/// connections still waiting for parameters learn that training is over.
async fn round_loop(
    driver: Arc<MasterDriver>,
    broadcast: BroadcastQueue<GlobalUpdate>,
    rounds: usize,
) -> Result<()> {
    let workers = driver.workers().get();

    for _ in 0..rounds {
        for _ in 0..workers {
            driver.recv_gradient_message_blocking().await?;
        }

        if driver.pending_records() == 0 {
            info!(round = driver.round(); "every worker ran out of data");
            break;
        }

        driver.generate_global_update_vector()?;
        broadcast.publish(driver.get_next_global_update_msg_from_queue()?);
    }

    driver.close();
    Ok(())
}

struct Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    driver: Arc<MasterDriver>,
    updates: BroadcastReceiver<GlobalUpdate>,
    rounds: usize,
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(mut self) -> Result<()> {
        let worker_id = self.join().await?;

        for round in 0..self.rounds as u64 {
            let msg: Msg = self.rx.recv().await?;
            let Msg::Data(Payload::Gradient(update)) = msg else {
                return Err(unexpected(&worker_id, round, &msg));
            };
            self.driver.add_incoming_gradient_message_to_queue(update.into_owned());

            let Some(update) = self.updates.recv().await? else {
                debug!(worker_id = worker_id.as_str(); "disconnecting worker");
                self.tx.send(&Msg::Control(Command::Disconnect)).await?;
                self.tx.shutdown().await?;
                return Ok(());
            };

            let msg = Msg::Data(Payload::Params(Cow::Borrowed(&*update)));
            self.tx.send(&msg).await?;
        }

        info!("worker finished: worker_id={worker_id}");
        self.tx.shutdown().await?;
        Ok(())
    }

    /// Waits for the worker to join and agrees on the run.
    async fn join(&mut self) -> Result<String> {
        let msg: Msg = self.rx.recv().await?;
        let Msg::Control(Command::Join { worker_id, params }) = msg else {
            return Err(unexpected("?", 0, &msg));
        };

        let expected = self.driver.params();
        if params != expected {
            let detail = format!("expected {expected} parameters, got {params}");
            self.tx.send(&Msg::Err(Cow::Borrowed(detail.as_str()))).await?;
            return Err(ServerErr::DimensionMismatch {
                got: params,
                expected,
            });
        }

        info!("worker joined: worker_id={worker_id}");
        let start = Msg::Control(Command::Start {
            rounds: self.rounds,
        });
        self.tx.send(&start).await?;

        Ok(worker_id)
    }
}

fn unexpected(worker_id: &str, round: u64, msg: &Msg<'_>) -> ServerErr {
    warn!(
        "unexpected message from worker: worker_id={} round={} got={}",
        worker_id,
        round,
        msg.kind()
    );

    ServerErr::UnexpectedMessage {
        round,
        got: msg.kind(),
    }
}
