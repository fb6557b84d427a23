//! Replay sender
//!
//! Serves an MBO file over TCP, one full pass per connecting client,
//! throttled to a fixed number of lines per second.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{BookError, Result};

/// Bind `addr` and serve `path` to every client
pub async fn serve(addr: &str, path: PathBuf, rate: u64) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| BookError::Transport(format!("Failed to bind {addr}: {e}")))?;
    info!(addr = %addr, path = %path.display(), rate, "Replay server started");
    serve_listener(listener, path, rate).await
}

/// Accept loop on an already bound listener
pub async fn serve_listener(listener: TcpListener, path: PathBuf, rate: u64) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!(peer = %peer, "Replay client connected");

        let path = path.clone();
        tokio::spawn(async move {
            match stream_file(BufWriter::new(socket), &path, rate).await {
                Ok(sent) => info!(peer = %peer, lines = sent, "Finished streaming MBO data"),
                Err(e) => warn!(peer = %peer, error = %e, "Replay stream aborted"),
            }
        });
    }
}

/// Copy `path` line by line into `writer`, at most `rate` lines per second,
/// then shut the writer down. Returns the number of lines sent.
pub async fn stream_file<W>(mut writer: W, path: &Path, rate: u64) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let rate = rate.max(1);
    let mut reader = BufReader::new(File::open(path).await?);
    let mut line = Vec::with_capacity(256);
    let mut window = Instant::now();
    let mut sent = 0u64;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        writer.write_all(&line).await?;
        sent += 1;

        if sent % rate == 0 {
            let elapsed = window.elapsed();
            if elapsed < Duration::from_secs(1) {
                writer.flush().await?;
                sleep(Duration::from_secs(1) - elapsed).await;
            }
            window = Instant::now();
        }
    }

    writer.flush().await?;
    writer.shutdown().await?;
    Ok(sent)
}
