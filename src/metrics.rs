//! Ingestion counters
//!
//! Each instance owns its own registry, so several ingestors (one per test,
//! or per feed) never collide on metric names.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::error::{BookError, Result};

/// Counters exposed on `/metrics`
#[derive(Clone)]
pub struct IngestMetrics {
    registry: Registry,
    /// Non-empty lines read from the feed, header excluded
    pub records_read: IntCounter,
    /// Records the decoder rejected
    pub records_skipped: IntCounter,
    /// Events applied to a book
    pub events_applied: IntCounter,
    /// Snapshots handed to the sinks
    pub snapshots_published: IntCounter,
    /// Failed snapshot file writes or store appends
    pub sink_failures: IntCounter,
}

impl IngestMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            records_read: counter("mbo_records_read_total", "MBO records read from the feed")?,
            records_skipped: counter(
                "mbo_records_skipped_total",
                "MBO records dropped as malformed or unrecognized",
            )?,
            events_applied: counter("mbo_events_applied_total", "Events applied to order books")?,
            snapshots_published: counter(
                "mbo_snapshots_published_total",
                "Depth snapshots handed to the sinks",
            )?,
            sink_failures: counter(
                "mbo_sink_failures_total",
                "Snapshot file writes or store appends that failed",
            )?,
            registry,
        })
    }

    /// Prometheus text exposition of all counters
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| BookError::Metrics(e.to_string()))
    }
}

impl std::fmt::Debug for IngestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestMetrics")
            .field("records_read", &self.records_read.get())
            .field("records_skipped", &self.records_skipped.get())
            .field("events_applied", &self.events_applied.get())
            .field("snapshots_published", &self.snapshots_published.get())
            .field("sink_failures", &self.sink_failures.get())
            .finish()
    }
}
