//! One side of the book
//!
//! Uses BTreeMap for sorted price level management: level insert/remove is
//! O(log L) and the top N levels are read in O(log L + N).

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{Level, PriceLevel, Side};

/// Price levels for one side, keyed by exact price.
#[derive(Debug, Clone)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Queue an order at the tail of the level for `price`, creating the
    /// level if needed.
    ///
    /// Returns `false` if the level refused the order; no empty level is
    /// left behind.
    pub fn insert(&mut self, order_id: u64, price: Decimal, size: Decimal) -> bool {
        let level = self.levels.entry(price).or_default();
        let inserted = level.insert(order_id, size);
        if !inserted && level.is_empty() {
            self.levels.remove(&price);
        }
        inserted
    }

    /// Whether the level at `price` can take another `size` without its
    /// aggregate overflowing.
    pub fn can_insert(&self, price: Decimal, size: Decimal) -> bool {
        self.levels
            .get(&price)
            .map_or(true, |level| level.can_absorb(size))
    }

    /// Remove an order from the level at `price`; empty levels are dropped.
    pub fn remove(&mut self, order_id: u64, price: Decimal) -> Option<Decimal> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Update an order's size without touching its queue position.
    pub fn resize(&mut self, order_id: u64, price: Decimal, size: Decimal) -> Option<Decimal> {
        self.levels.get_mut(&price)?.resize(order_id, size)
    }

    pub fn level(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// Best price: highest bid or lowest ask.
    pub fn best(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(p, _)| *p),
            Side::Sell => self.levels.first_key_value().map(|(p, _)| *p),
        }
    }

    /// Levels ordered toward the market: descending for bids, ascending for
    /// asks.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (Decimal, &PriceLevel)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev().map(|(p, l)| (*p, l))),
            Side::Sell => Box::new(self.levels.iter().map(|(p, l)| (*p, l))),
        }
    }

    /// Top `depth` aggregated levels, best first. Levels without positive
    /// quantity are skipped.
    pub fn top(&self, depth: usize) -> Vec<Level> {
        self.iter()
            .filter_map(|(price, level)| {
                let quantity = level.aggregate_quantity();
                (quantity > Decimal::ZERO).then_some(Level { price, quantity })
            })
            .take(depth)
            .collect()
    }

    /// Number of distinct prices.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
