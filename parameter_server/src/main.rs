use std::{env, io, path::PathBuf};

use comms::specs::{self, ServerSpec};
use log::info;
use parameter_server::ParameterServer;
use tokio::{net::TcpListener, signal};

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("usage: parameter_server <server-spec.json>"))?;
    let spec: ServerSpec = specs::from_path(&path).map_err(io::Error::other)?;

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let mut pserver = ParameterServer::new(&spec).map_err(io::Error::other)?;
    let list = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    for _ in 0..spec.workers {
        let (stream, addr) = list.accept().await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        pserver.spawn(rx, tx);
        info!("worker connected from {addr}");
    }

    tokio::select! {
        ret = pserver.run() => {
            let outcome = ret.map_err(io::Error::other)?;
            info!(rounds = outcome.rounds; "training finished");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
