//! Ingestion loop
//!
//! Reads the header, then decodes and applies one record at a time, strictly
//! in arrival order. The feed read is the only await point between events,
//! so stopping the loop always leaves every book at a fully applied event.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncBufRead;
use tracing::{debug, error, info, trace};

use super::FeedClient;
use crate::config::Config;
use crate::error::{BookError, Result};
use crate::metrics::IngestMetrics;
use crate::orderbook::OrderBookManager;
use crate::parser::{parse_record, Schema};
use crate::publisher::PublisherHandle;

/// Snapshot cadence and defaults for the loop
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub instrument_default: String,
    /// Snapshot every N applied events, 0 disables
    pub snapshot_every: u64,
    /// Snapshot after this much wall-clock time, `None` disables
    pub snapshot_interval: Option<Duration>,
    pub top_depth: usize,
}

impl From<&Config> for IngestSettings {
    fn from(config: &Config) -> Self {
        Self {
            instrument_default: config.instrument_default.clone(),
            snapshot_every: config.snapshot_every,
            snapshot_interval: (config.snapshot_interval_ms > 0)
                .then(|| Duration::from_millis(config.snapshot_interval_ms)),
            top_depth: config.top_depth,
        }
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub records: u64,
    pub skipped: u64,
    pub events: u64,
    pub snapshots: u64,
}

/// Drives books from a feed and publishes periodic snapshots
pub struct Ingestor {
    settings: IngestSettings,
    manager: OrderBookManager,
    metrics: Arc<IngestMetrics>,
    summary: IngestSummary,
    last_snapshot: Instant,
}

impl Ingestor {
    pub fn new(settings: IngestSettings, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            settings,
            manager: OrderBookManager::new(),
            metrics,
            summary: IngestSummary::default(),
            last_snapshot: Instant::now(),
        }
    }

    /// Books as of the last applied event
    pub fn manager(&self) -> &OrderBookManager {
        &self.manager
    }

    pub fn summary(&self) -> IngestSummary {
        self.summary
    }

    /// Consume the feed until it ends, fails, or `shutdown` resolves.
    ///
    /// A final snapshot of the last active instrument is published on every
    /// exit path unless the last event already triggered one. Transport
    /// errors are returned after that; the books stay queryable through
    /// [`Ingestor::manager`].
    pub async fn run<R, F>(
        &mut self,
        feed: &mut FeedClient<R>,
        publisher: &PublisherHandle,
        shutdown: F,
    ) -> Result<IngestSummary>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let header = tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(self.summary),
            line = feed.next_line() => line?,
        };
        let schema = Schema::from_header(&header.ok_or(BookError::MissingHeader)?);
        info!(columns = schema.width(), "Feed header received");

        self.last_snapshot = Instant::now();
        let mut last_instrument: Option<String> = None;
        let mut unpublished = false;
        let mut failure: Option<BookError> = None;

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping ingestion");
                    break;
                }
                line = feed.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!(lines = feed.lines_read(), "Feed ended");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Feed read failed");
                    failure = Some(e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            self.summary.records += 1;
            self.metrics.records_read.inc();

            let Some(record) = parse_record(&schema, &line) else {
                trace!(line = %line, "Skipping malformed record");
                self.summary.skipped += 1;
                self.metrics.records_skipped.inc();
                continue;
            };

            let instrument = record
                .instrument
                .unwrap_or_else(|| self.settings.instrument_default.clone());
            trace!(
                instrument = %instrument,
                kind = record.event.kind(),
                order_id = ?record.event.order_id(),
                "Applying event"
            );
            self.manager.apply(&instrument, &record.event);
            self.summary.events += 1;
            self.metrics.events_applied.inc();

            if self.snapshot_due() {
                self.publish(&instrument, publisher).await;
                unpublished = false;
            } else {
                unpublished = true;
            }
            last_instrument = Some(instrument);
        }

        if let (true, Some(instrument)) = (unpublished, last_instrument) {
            self.publish(&instrument, publisher).await;
        }

        info!(
            records = self.summary.records,
            skipped = self.summary.skipped,
            events = self.summary.events,
            snapshots = self.summary.snapshots,
            "Ingestion stopped"
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }

    fn snapshot_due(&self) -> bool {
        let by_count = self.settings.snapshot_every > 0
            && self.summary.events % self.settings.snapshot_every == 0;
        let by_time = self
            .settings
            .snapshot_interval
            .is_some_and(|interval| self.last_snapshot.elapsed() >= interval);
        by_count || by_time
    }

    async fn publish(&mut self, instrument: &str, publisher: &PublisherHandle) {
        let Some(book) = self.manager.book(instrument) else {
            return;
        };

        debug!(
            instrument = %instrument,
            orders = book.order_count(),
            best_bid = ?book.best_bid(),
            best_ask = ?book.best_ask(),
            mid_price = ?book.mid_price(),
            spread_bps = ?book.spread_bps(),
            "Order book status"
        );

        let snapshot = book.depth_snapshot(self.settings.top_depth);
        self.last_snapshot = Instant::now();
        if publisher.send(snapshot).await {
            self.summary.snapshots += 1;
            self.metrics.snapshots_published.inc();
        }
    }
}
