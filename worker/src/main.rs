use std::{env, io, path::PathBuf};

use comms::specs::{self, WorkerSpec};
use log::info;
use tokio::{net::TcpStream, signal};

use worker::WorkerBuilder;

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("usage: worker <worker-spec.json>"))?;
    let spec: WorkerSpec = specs::from_path(&path).map_err(io::Error::other)?;

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let worker = WorkerBuilder::new().build(&spec)?;

    let stream = TcpStream::connect(&addr).await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    info!("connected to the master at {addr}");

    tokio::select! {
        ret = worker.run(rx, tx) => {
            let driver = ret?;
            info!("wrapping up after round {}", driver.round());
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
