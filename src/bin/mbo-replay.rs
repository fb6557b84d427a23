//! MBO Replay Sender
//!
//! Streams a recorded MBO file to TCP clients at a fixed line rate.

use std::path::PathBuf;
use tracing::info;

use mbo_book::{replay, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mbo_book::init_tracing();

    let config = Config::load()?;
    info!(
        path = %config.reader_path,
        addr = %config.feed_addr(),
        rate = config.stream_rate,
        "Starting MBO replay sender"
    );

    replay::serve(
        &config.feed_addr(),
        PathBuf::from(&config.reader_path),
        config.stream_rate,
    )
    .await?;

    Ok(())
}
