//! Configuration module for the book builder
//!
//! Values are layered: built-in defaults, then an optional `mbo-book` config
//! file, then `MBO_`-prefixed environment variables (`MBO_TOP_DEPTH=20`).

use serde::Deserialize;

use crate::error::{BookError, Result};

/// Where the MBO feed comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Tcp,
    File,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Instrument used when a record carries no symbol
    pub instrument_default: String,

    /// Snapshot every N applied events (0 disables the count trigger)
    pub snapshot_every: u64,

    /// Snapshot when this much wall-clock time has passed (0 disables)
    pub snapshot_interval_ms: u64,

    /// Depth levels per side in each snapshot
    pub top_depth: usize,

    /// JSON file holding the latest snapshot
    pub output_json: String,

    /// SQLite database for the snapshot history
    pub db_path: String,

    /// Feed transport
    pub feed_source: FeedSource,

    /// MBO file for `file` mode and for the replay sender
    pub reader_path: String,

    /// Feed endpoint
    pub tcp_host: String,
    pub tcp_port: u16,

    /// Replay sender rate in lines per second
    pub stream_rate: u64,

    /// Health/metrics HTTP port (0 disables the server)
    pub health_port: u16,
}

impl Config {
    /// Load configuration from defaults, optional file and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config: Self = config::Config::builder()
            .set_default("instrument_default", defaults.instrument_default)?
            .set_default("snapshot_every", defaults.snapshot_every)?
            .set_default("snapshot_interval_ms", defaults.snapshot_interval_ms)?
            .set_default("top_depth", defaults.top_depth as u64)?
            .set_default("output_json", defaults.output_json)?
            .set_default("db_path", defaults.db_path)?
            .set_default("feed_source", "tcp")?
            .set_default("reader_path", defaults.reader_path)?
            .set_default("tcp_host", defaults.tcp_host)?
            .set_default("tcp_port", defaults.tcp_port as u64)?
            .set_default("stream_rate", defaults.stream_rate)?
            .set_default("health_port", defaults.health_port as u64)?
            .add_source(config::File::with_name("mbo-book").required(false))
            .add_source(config::Environment::with_prefix("MBO").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ingestion loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.top_depth == 0 {
            return Err(BookError::ConfigError(
                "top_depth must be a positive integer".to_string(),
            ));
        }
        if self.snapshot_every == 0 && self.snapshot_interval_ms == 0 {
            return Err(BookError::ConfigError(
                "at least one of snapshot_every / snapshot_interval_ms must be set".to_string(),
            ));
        }
        if self.stream_rate == 0 {
            return Err(BookError::ConfigError(
                "stream_rate must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` of the feed
    pub fn feed_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instrument_default: "CLX5".to_string(),
            snapshot_every: 500,
            snapshot_interval_ms: 1000,
            top_depth: 10,
            output_json: "reconstructed_book.json".to_string(),
            db_path: "orderbook_snapshots.db".to_string(),
            feed_source: FeedSource::Tcp,
            reader_path: "data/processed/CLX5_mbo.txt".to_string(),
            tcp_host: "127.0.0.1".to_string(),
            tcp_port: 9999,
            stream_rate: 50_000,
            health_port: 9090,
        }
    }
}
