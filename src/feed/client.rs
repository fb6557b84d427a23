//! Line-oriented feed client
//!
//! Reads raw MBO lines from any buffered async source: a TCP connection, a
//! file, or an in-memory buffer in tests.

use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::info;

use crate::error::{BookError, Result};

/// Feed client over a single connection or file
pub struct FeedClient<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
}

impl FeedClient<BufReader<TcpStream>> {
    /// Connect to a TCP feed
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| BookError::Transport(format!("Failed to connect to {addr}: {e}")))?;
        info!(addr = %addr, "Connected to MBO feed");
        Ok(Self::new(BufReader::new(stream)))
    }
}

impl FeedClient<BufReader<File>> {
    /// Read a feed from a file
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|e| BookError::Transport(format!("Failed to open {}: {e}", path.display())))?;
        info!(path = %path.display(), "Reading MBO feed from file");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> FeedClient<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            lines_read: 0,
        }
    }

    /// Next line without its terminator, or `None` at end of stream.
    ///
    /// Invalid UTF-8 is replaced rather than failing the stream; the decoder
    /// rejects such records on its own.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        self.lines_read += 1;

        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}
