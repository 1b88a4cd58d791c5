use std::path::Path;

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::{mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
    engine::EngineEvent,
    messages::{ControlRequest, ControlResponse},
};

pub const SOCKET_FILE: &str = "control.sock";

/// Accepts cli connections on a unix socket in the application directory and forwards their
/// requests to the engine. One JSON request per line, one JSON response per line back.
pub struct ControlListener {
    listener: UnixListener,
    engine: mpsc::Sender<EngineEvent>,
    shutdown: CancellationToken,
}

impl ControlListener {
    pub fn bind(
        dir: &Path,
        engine: mpsc::Sender<EngineEvent>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let path = dir.join(SOCKET_FILE);
        // A leftover socket from a crashed daemon blocks the bind.
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path)?;
        info!("Control socket listening on {path:?}");
        Ok(Self {
            listener,
            engine,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Control listener shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let engine = self.engine.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, engine).await {
                                    error!("Control connection failed {e:?}");
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept control connection {e:?}"),
                    }
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, engine: mpsc::Sender<EngineEvent>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => dispatch(&engine, request).await,
            Err(e) => ControlResponse::fail(format!("invalid request: {e}")),
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn dispatch(engine: &mpsc::Sender<EngineEvent>, request: ControlRequest) -> ControlResponse {
    let (respond, receiver) = oneshot::channel();
    if engine
        .send(EngineEvent::Control { request, respond })
        .await
        .is_err()
    {
        return ControlResponse::fail("daemon is shutting down");
    }
    receiver
        .await
        .unwrap_or_else(|_| ControlResponse::fail("daemon dropped the request"))
}
