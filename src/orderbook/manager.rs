//! Order book manager
//!
//! Manages one independent order book per instrument.

use std::collections::HashMap;

use super::{BookEvent, DepthSnapshot, OrderBook};

/// Manages order books for multiple instruments
#[derive(Debug, Default)]
pub struct OrderBookManager {
    books: HashMap<String, OrderBook>,
}

impl OrderBookManager {
    /// Create a new order book manager
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
        }
    }

    /// Apply an event to the instrument's book, creating the book on first
    /// use
    pub fn apply(&mut self, instrument: &str, event: &BookEvent) -> &OrderBook {
        let book = self
            .books
            .entry(instrument.to_string())
            .or_insert_with(|| OrderBook::new(instrument));
        book.apply(event);
        book
    }

    /// Get the book of a specific instrument
    pub fn book(&self, instrument: &str) -> Option<&OrderBook> {
        self.books.get(instrument)
    }

    /// Depth snapshot of a specific instrument
    pub fn snapshot(&self, instrument: &str, depth: usize) -> Option<DepthSnapshot> {
        self.books.get(instrument).map(|book| book.depth_snapshot(depth))
    }

    /// Get list of instruments being tracked
    pub fn instruments(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    /// Check if an instrument exists
    pub fn has_instrument(&self, instrument: &str) -> bool {
        self.books.contains_key(instrument)
    }

    /// Resting orders across all books
    pub fn total_orders(&self) -> usize {
        self.books.values().map(OrderBook::order_count).sum()
    }
}
