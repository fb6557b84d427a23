//! Publisher module for snapshot sinks
//!
//! Snapshots are taken in the ingestion loop and handed over as owned
//! copies; a background task writes them to the JSON file and the store.
//! Sink failures are logged and counted, never propagated.

mod file;

pub use file::SnapshotWriter;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::metrics::IngestMetrics;
use crate::orderbook::DepthSnapshot;
use crate::storage::SnapshotStore;

/// Snapshots queued between the ingestion loop and the sink task
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Fans a snapshot out to the JSON file and the snapshot store
pub struct Publisher {
    writer: SnapshotWriter,
    store: SnapshotStore,
    metrics: Arc<IngestMetrics>,
}

impl Publisher {
    pub fn new(writer: SnapshotWriter, store: SnapshotStore, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            writer,
            store,
            metrics,
        }
    }

    /// Write a snapshot to both sinks; each failure is handled on its own
    pub async fn publish(&self, snapshot: &DepthSnapshot) {
        if let Err(e) = self.writer.write(snapshot).await {
            warn!(error = %e, instrument = %snapshot.instrument, "Failed to write snapshot file");
            self.metrics.sink_failures.inc();
        }

        if let Err(e) = self.store.append(snapshot).await {
            warn!(error = %e, instrument = %snapshot.instrument, "Failed to persist snapshot");
            self.metrics.sink_failures.inc();
        }

        debug!(
            instrument = %snapshot.instrument,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "Published snapshot"
        );
    }

    /// Move the publisher onto its own task
    pub fn spawn(self, capacity: usize) -> PublisherHandle {
        let (tx, mut rx) = mpsc::channel::<DepthSnapshot>(capacity);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                self.publish(&snapshot).await;
            }
        });
        PublisherHandle { tx, task }
    }
}

/// Sending side of a spawned [`Publisher`]
pub struct PublisherHandle {
    tx: mpsc::Sender<DepthSnapshot>,
    task: JoinHandle<()>,
}

impl PublisherHandle {
    /// Queue a snapshot, waiting if the sink task is behind.
    ///
    /// Returns `false` if the sink task is gone; the caller keeps going.
    pub async fn send(&self, snapshot: DepthSnapshot) -> bool {
        match self.tx.send(snapshot).await {
            Ok(()) => true,
            Err(_) => {
                warn!("Publisher task stopped, dropping snapshot");
                false
            }
        }
    }

    /// Drain queued snapshots and wait for the sink task to exit
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!(error = %e, "Publisher task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Level;
    use rust_decimal_macros::dec;

    fn snapshot(timestamp: i64) -> DepthSnapshot {
        DepthSnapshot {
            instrument: "CLX5".to_string(),
            timestamp,
            bids: vec![Level {
                price: dec!(100),
                quantity: dec!(15),
            }],
            asks: vec![],
        }
    }

    #[tokio::test]
    async fn test_spawned_publisher_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_memory().await.unwrap();
        let metrics = Arc::new(IngestMetrics::new().unwrap());
        let writer = SnapshotWriter::new(dir.path().join("book.json"));

        let handle = Publisher::new(writer, store.clone(), metrics.clone()).spawn(2);
        for ts in 1..=5 {
            assert!(handle.send(snapshot(ts * 1_000_000_000)).await);
        }
        handle.finish().await;

        let text = std::fs::read_to_string(dir.path().join("book.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["timestamp"].as_f64(), Some(5.0));
        assert_eq!(store.count().await.unwrap(), 5);
        assert_eq!(metrics.sink_failures.get(), 0);
    }

    #[tokio::test]
    async fn test_file_failure_does_not_block_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_memory().await.unwrap();
        let metrics = Arc::new(IngestMetrics::new().unwrap());
        let writer = SnapshotWriter::new(dir.path().join("missing").join("book.json"));

        let publisher = Publisher::new(writer, store.clone(), metrics.clone());
        publisher.publish(&snapshot(1)).await;

        assert_eq!(metrics.sink_failures.get(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
