//! Parser module for MBO CSV records
//!
//! Turns one CSV line plus the header schema into a normalized
//! [`BookEvent`]. Anything malformed or unrecognized decodes to `None` and
//! never reaches the book.

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::orderbook::{BookEvent, Side};

/// MBO action code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Modify,
    Cancel,
    Trade,
    Fill,
    /// Book reset; `R` and `N` both resynchronize the book
    Clear,
}

impl Action {
    /// Parse a one-letter action code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Action::Add),
            "M" => Some(Action::Modify),
            "C" => Some(Action::Cancel),
            "T" => Some(Action::Trade),
            "F" => Some(Action::Fill),
            "R" | "N" => Some(Action::Clear),
            _ => None,
        }
    }
}

/// Parse a side tag; anything but buy/sell has no side
pub fn parse_side(tag: &str) -> Option<Side> {
    match tag.trim().to_ascii_uppercase().as_str() {
        "B" | "BID" | "BUY" => Some(Side::Buy),
        "A" | "S" | "ASK" | "SELL" => Some(Side::Sell),
        _ => None,
    }
}

/// Column name → index map taken from the feed's header line
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: HashMap<String, usize>,
    width: usize,
}

impl Schema {
    /// Build the schema from a header line
    pub fn from_header(line: &str) -> Self {
        let names: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self {
            columns,
            width: names.len(),
        }
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Number of columns a complete record must have
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}

/// A decoded record: the event plus the instrument it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MboRecord {
    /// `symbol` column, if the feed carries one
    pub instrument: Option<String>,
    pub event: BookEvent,
}

/// Decode one CSV record. Returns `None` for incomplete rows, unknown
/// action codes, unparseable numbers and adds without a side.
pub fn parse_record(schema: &Schema, line: &str) -> Option<MboRecord> {
    let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
    if parts.len() < schema.width() {
        return None;
    }

    let get = |name: &str| field(schema, &parts, name);

    let action = Action::from_code(get("action")?)?;
    let ts = get("ts_event").map(parse_timestamp).unwrap_or(0);
    let order_id = match get("order_id") {
        Some(raw) => raw.parse::<u64>().ok()?,
        None => 0,
    };
    let price = parse_decimal(get("price"))?;
    let size = parse_decimal(get("size"))?;
    let instrument = get("symbol").map(str::to_string);

    let event = match action {
        Action::Add => BookEvent::Add {
            order_id,
            side: parse_side(get("side")?)?,
            price,
            size,
            ts,
        },
        Action::Modify => BookEvent::Modify {
            order_id,
            price,
            size,
            ts,
        },
        Action::Cancel => BookEvent::Cancel { order_id, ts },
        Action::Trade => BookEvent::Trade {
            order_id,
            quantity: size,
            ts,
        },
        Action::Fill => BookEvent::Fill {
            order_id,
            quantity: size,
            ts,
        },
        Action::Clear => BookEvent::Clear { ts },
    };

    Some(MboRecord { instrument, event })
}

/// Trimmed column value; empty counts as absent
fn field<'a>(schema: &Schema, parts: &[&'a str], name: &str) -> Option<&'a str> {
    let value = parts.get(schema.index(name)?)?.trim();
    (!value.is_empty()).then_some(value)
}

/// Absent values are zero; present but unparseable values reject the record
fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    match raw {
        None => Some(Decimal::ZERO),
        Some(s) => Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .ok(),
    }
}

/// Event time in nanoseconds since epoch.
///
/// Accepts integer nanoseconds or an ISO-like datetime with an optional
/// offset; naive datetimes are UTC. Unparseable values map to 0.
pub fn parse_timestamp(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(nanos) = raw.parse::<i64>() {
        return nanos;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map(|dt| dt.naive_utc())
        .or_else(|_| {
            let naive = raw.trim_end_matches(['Z', 'z']);
            NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f"))
        });

    parsed
        .ok()
        .and_then(|naive| naive.and_utc().timestamp_nanos_opt())
        .unwrap_or(0)
}
