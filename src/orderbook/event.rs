//! Normalized book events

use rust_decimal::Decimal;

use super::Side;

/// A decoded MBO event ready to be applied to an [`OrderBook`](super::OrderBook)
///
/// All timestamps are nanoseconds since the Unix epoch. Trade and Fill
/// quantities are executed amounts, not remaining sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookEvent {
    Add {
        order_id: u64,
        side: Side,
        price: Decimal,
        size: Decimal,
        ts: i64,
    },
    Modify {
        order_id: u64,
        price: Decimal,
        size: Decimal,
        ts: i64,
    },
    Cancel {
        order_id: u64,
        ts: i64,
    },
    Trade {
        order_id: u64,
        quantity: Decimal,
        ts: i64,
    },
    Fill {
        order_id: u64,
        quantity: Decimal,
        ts: i64,
    },
    Clear {
        ts: i64,
    },
}

impl BookEvent {
    /// Event time
    pub fn ts(&self) -> i64 {
        match self {
            BookEvent::Add { ts, .. }
            | BookEvent::Modify { ts, .. }
            | BookEvent::Cancel { ts, .. }
            | BookEvent::Trade { ts, .. }
            | BookEvent::Fill { ts, .. }
            | BookEvent::Clear { ts } => *ts,
        }
    }

    /// Order the event refers to, `None` for Clear
    pub fn order_id(&self) -> Option<u64> {
        match self {
            BookEvent::Add { order_id, .. }
            | BookEvent::Modify { order_id, .. }
            | BookEvent::Cancel { order_id, .. }
            | BookEvent::Trade { order_id, .. }
            | BookEvent::Fill { order_id, .. } => Some(*order_id),
            BookEvent::Clear { .. } => None,
        }
    }

    /// Short tag for logs
    pub fn kind(&self) -> &'static str {
        match self {
            BookEvent::Add { .. } => "add",
            BookEvent::Modify { .. } => "modify",
            BookEvent::Cancel { .. } => "cancel",
            BookEvent::Trade { .. } => "trade",
            BookEvent::Fill { .. } => "fill",
            BookEvent::Clear { .. } => "clear",
        }
    }
}
