//! MBO Book Builder
//!
//! Connects to an MBO feed (TCP or file), rebuilds the order book event by
//! event and publishes periodic depth snapshots.

use std::sync::Arc;
use tracing::{info, warn};

use mbo_book::publisher::DEFAULT_QUEUE_CAPACITY;
use mbo_book::{
    health, Config, FeedClient, FeedSource, IngestMetrics, IngestSettings, Ingestor, Publisher,
    SnapshotStore, SnapshotWriter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mbo_book::init_tracing();

    info!("Starting MBO book builder");

    // Load configuration
    let config = Config::load()?;
    info!(
        instrument = %config.instrument_default,
        source = ?config.feed_source,
        snapshot_every = config.snapshot_every,
        snapshot_interval_ms = config.snapshot_interval_ms,
        depth = config.top_depth,
        "Configuration loaded"
    );

    let metrics = Arc::new(IngestMetrics::new()?);

    // Start health check server
    if config.health_port != 0 {
        let health_metrics = metrics.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, health_metrics).await {
                warn!(error = %e, "Health server error");
            }
        });
    }

    let store = SnapshotStore::open(&config.db_path).await?;
    let writer = SnapshotWriter::new(&config.output_json);
    let publisher =
        Publisher::new(writer, store.clone(), metrics.clone()).spawn(DEFAULT_QUEUE_CAPACITY);

    let mut ingestor = Ingestor::new(IngestSettings::from(&config), metrics);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let result = match config.feed_source {
        FeedSource::Tcp => match FeedClient::connect_tcp(&config.feed_addr()).await {
            Ok(mut feed) => ingestor.run(&mut feed, &publisher, shutdown).await,
            Err(e) => Err(e),
        },
        FeedSource::File => match FeedClient::open_file(&config.reader_path).await {
            Ok(mut feed) => ingestor.run(&mut feed, &publisher, shutdown).await,
            Err(e) => Err(e),
        },
    };

    publisher.finish().await;
    store.close().await;

    let summary = result?;
    info!(
        records = summary.records,
        skipped = summary.skipped,
        events = summary.events,
        snapshots = summary.snapshots,
        instruments = ?ingestor.manager().instruments(),
        "MBO book builder finished"
    );

    Ok(())
}
