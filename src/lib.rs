//! MBO Book Builder Library
//!
//! Reconstructs limit order books from market-by-order event feeds and
//! publishes periodic top-N depth snapshots to a JSON file and a SQLite
//! history table.

pub mod config;
pub mod error;
pub mod feed;
pub mod health;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod publisher;
pub mod replay;
pub mod storage;

pub use config::{Config, FeedSource};
pub use error::{BookError, Result};
pub use feed::{FeedClient, IngestSettings, IngestSummary, Ingestor};
pub use metrics::IngestMetrics;
pub use orderbook::{
    BookDepth, BookEvent, BookSide, DepthSnapshot, Level, Order, OrderBook, OrderBookManager,
    PriceLevel, Side,
};
pub use parser::{parse_record, MboRecord, Schema};
pub use publisher::{Publisher, PublisherHandle, SnapshotWriter};
pub use storage::SnapshotStore;

/// Install the JSON log subscriber used by the binaries
pub fn init_tracing() {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();
}
