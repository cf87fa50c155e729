use std::{borrow::Cow, io};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task,
};

use crate::{Result, WorkerDriver, WorkerErr};

/// Infrastructure worker runtime.
///
/// Drives a `WorkerDriver` against a master, training happens on tokio's blocking pool
/// with the driver moved in and out of the blocking task.
pub struct Worker {
    driver: WorkerDriver,
}

impl Worker {
    /// Creates a new `Worker`.
    ///
    /// # Args
    /// * `driver` - The set up driver to run.
    pub fn new(driver: WorkerDriver) -> Self {
        Self { driver }
    }

    /// Joins the master and trains until the last round or until the master disconnects it.
    ///
    /// # Args
    /// * `rx` - Receiving end of the master channel.
    /// * `tx` - Sending end of the master channel.
    ///
    /// # Returns
    /// The driver, holding the last parameters received from the master.
    ///
    /// # Errors
    /// Returns `WorkerErr` on I/O failures, training errors or protocol violations.
    pub async fn run<R, W>(self, mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<WorkerDriver>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut driver = self.driver;
        let worker_id = driver.worker_id().to_string();

        let join = Msg::Control(Command::Join {
            worker_id: worker_id.clone(),
            params: driver.params().len(),
        });
        tx.send(&join).await?;

        let rounds = match rx.recv::<Msg>().await? {
            Msg::Control(Command::Start { rounds }) => rounds,
            Msg::Err(detail) => return Err(WorkerErr::Rejected(detail.into_owned())),
            other => return Err(unexpected(&worker_id, 0, &other)),
        };
        info!("joined the master: worker_id={worker_id} rounds={rounds}");

        for _ in 0..rounds {
            let round = driver.round();

            let (back, report) = task::spawn_blocking(move || {
                let report = driver.run_next_training_batch();
                (driver, report)
            })
            .await
            .map_err(io::Error::from)?;
            driver = back;
            let report = report?;

            debug!(
                worker_id = worker_id.as_str(),
                round = round,
                records = report.records;
                "sending gradient"
            );

            let update = driver.generate_update_message();
            let msg = Msg::Data(Payload::Gradient(Cow::Borrowed(&update)));
            tx.send(&msg).await?;

            match rx.recv::<Msg>().await? {
                Msg::Data(Payload::Params(update)) => {
                    driver.process_incoming_parameter_vector_message(&update)?;
                }
                Msg::Control(Command::Disconnect) => {
                    info!("disconnect received from master: worker_id={worker_id} round={round}");
                    break;
                }
                Msg::Err(detail) => return Err(WorkerErr::Rejected(detail.into_owned())),
                other => return Err(unexpected(&worker_id, round, &other)),
            }
        }

        info!("worker finished: worker_id={worker_id}");
        tx.shutdown().await?;
        Ok(driver)
    }
}

fn unexpected(worker_id: &str, round: u64, msg: &Msg<'_>) -> WorkerErr {
    warn!(
        "unexpected message from master: worker_id={} round={} got={}",
        worker_id,
        round,
        msg.kind()
    );

    WorkerErr::UnexpectedMessage {
        round,
        got: msg.kind(),
    }
}
