//! Order book module
//!
//! Rebuilds per-order book state from MBO events and derives aggregated
//! depth views from it.

mod book;
mod event;
mod level;
mod manager;
mod side;

pub use book::OrderBook;
pub use event::BookEvent;
pub use level::PriceLevel;
pub use manager::OrderBookManager;
pub use side::BookSide;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// One resting order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: u64,
    pub side: Side,
    pub price: Decimal,
    /// Remaining quantity, always positive while the order rests
    pub size: Decimal,
    /// Nanoseconds since epoch of the last event that touched the order
    pub ts: i64,
}

/// A single aggregated level in a depth view
///
/// Serialized as a `[price, quantity]` pair of JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.price.to_f64().unwrap_or_default())?;
        pair.serialize_element(&self.quantity.to_f64().unwrap_or_default())?;
        pair.end()
    }
}

/// Top-N aggregated view of both sides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDepth {
    /// Best bid first, strictly descending prices
    pub bids: Vec<Level>,
    /// Best ask first, strictly ascending prices
    pub asks: Vec<Level>,
}

/// Point-in-time depth snapshot handed to the sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthSnapshot {
    pub instrument: String,
    /// Event time of the last applied event, written as epoch seconds
    #[serde(serialize_with = "nanos_as_epoch_seconds")]
    pub timestamp: i64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl DepthSnapshot {
    pub fn epoch_seconds(&self) -> f64 {
        epoch_seconds(self.timestamp)
    }
}

/// Whole seconds and the sub-second remainder are converted separately so
/// that exact half-second timestamps stay exact.
fn epoch_seconds(nanos: i64) -> f64 {
    let secs = nanos.div_euclid(1_000_000_000);
    let rem = nanos.rem_euclid(1_000_000_000);
    secs as f64 + rem as f64 / 1e9
}

fn nanos_as_epoch_seconds<S: Serializer>(nanos: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(epoch_seconds(*nanos))
}
