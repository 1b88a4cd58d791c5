use std::path::Path;

use anyhow::Result;

use crate::daemon::messages::{ControlRequest, ControlResponse};

/// Sends one request to the daemon's control socket and waits for its answer.
#[cfg(unix)]
pub async fn send_request(dir: &Path, request: &ControlRequest) -> Result<ControlResponse> {
    use anyhow::Context;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::UnixStream,
    };

    use crate::daemon::control::SOCKET_FILE;

    let path = dir.join(SOCKET_FILE);
    let stream = UnixStream::connect(&path).await.with_context(|| {
        format!("Failed to reach the daemon at {path:?}. Is it running? Try 'shiftwatch init'")
    })?;
    let (reader, mut writer) = stream.into_split();

    let mut payload = serde_json::to_vec(request)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;

    let line = BufReader::new(reader)
        .lines()
        .next_line()
        .await?
        .context("Daemon closed the connection without answering")?;
    Ok(serde_json::from_str(&line)?)
}

#[cfg(not(unix))]
pub async fn send_request(_dir: &Path, _request: &ControlRequest) -> Result<ControlResponse> {
    anyhow::bail!("The daemon control socket is only available on unix")
}
