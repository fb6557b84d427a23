//! Snapshot persistence layer
//!
//! Append-only SQLite table of depth snapshots, one row per published
//! snapshot with the ladders stored as JSON text.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::Result;
use crate::orderbook::DepthSnapshot;

/// A persisted snapshot row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    /// Epoch seconds
    pub ts: f64,
    pub instrument: String,
    pub bids: String,
    pub asks: String,
}

/// Snapshot store backed by SQLite
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    /// Open (creating if missing) the database file and its table
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %path, "Snapshot store ready");
        Ok(store)
    }

    /// Private in-memory database, kept alive on a single pinned connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS orderbook_snapshots (
                ts REAL,
                instrument TEXT,
                bids TEXT,
                asks TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append one snapshot row
    pub async fn append(&self, snapshot: &DepthSnapshot) -> Result<()> {
        let bids = serde_json::to_string(&snapshot.bids)?;
        let asks = serde_json::to_string(&snapshot.asks)?;

        sqlx::query(
            r"
            INSERT INTO orderbook_snapshots (ts, instrument, bids, asks)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(snapshot.epoch_seconds())
        .bind(snapshot.instrument.as_str())
        .bind(bids)
        .bind(asks)
        .execute(&self.pool)
        .await?;

        debug!(instrument = %snapshot.instrument, ts = snapshot.timestamp, "Snapshot persisted");
        Ok(())
    }

    /// Number of stored rows
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM orderbook_snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Most recently appended row for an instrument
    pub async fn latest(&self, instrument: &str) -> Result<Option<StoredSnapshot>> {
        let row = sqlx::query(
            r"
            SELECT ts, instrument, bids, asks FROM orderbook_snapshots
            WHERE instrument = ?
            ORDER BY rowid DESC
            LIMIT 1
            ",
        )
        .bind(instrument)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<StoredSnapshot> {
            Ok(StoredSnapshot {
                ts: row.try_get("ts")?,
                instrument: row.try_get("instrument")?,
                bids: row.try_get("bids")?,
                asks: row.try_get("asks")?,
            })
        })
        .transpose()
    }

    /// Close the pool, flushing the database
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
