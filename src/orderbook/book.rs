//! Core order book implementation
//!
//! Holds every resting order in a global index and queues it in the price
//! level of its side. Events for unknown orders are ignored, never errors:
//! a replay that starts mid-session references orders it has never seen.

use ahash::AHashMap;
use rust_decimal::Decimal;
use tracing::trace;

use super::{BookDepth, BookEvent, BookSide, DepthSnapshot, Order, Side};
use crate::error::{BookError, Result};

/// Order book for a single instrument
#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument: String,
    /// Global index, the only authoritative existence check
    orders: AHashMap<u64, Order>,
    bids: BookSide,
    asks: BookSide,
    /// Timestamp of the last applied event
    last_ts: i64,
    events_applied: u64,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            orders: AHashMap::new(),
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            last_ts: 0,
            events_applied: 0,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Apply one event
    pub fn apply(&mut self, event: &BookEvent) {
        match *event {
            BookEvent::Add {
                order_id,
                side,
                price,
                size,
                ts,
            } => self.on_add(order_id, side, price, size, ts),
            BookEvent::Modify {
                order_id,
                price,
                size,
                ts,
            } => self.on_modify(order_id, price, size, ts),
            BookEvent::Cancel { order_id, .. } => self.on_cancel(order_id),
            BookEvent::Trade {
                order_id,
                quantity,
                ts,
            }
            | BookEvent::Fill {
                order_id,
                quantity,
                ts,
            } => self.on_trade(order_id, quantity, ts),
            BookEvent::Clear { .. } => self.on_clear(),
        }

        self.last_ts = event.ts();
        self.events_applied += 1;

        #[cfg(debug_assertions)]
        if let Some(order_id) = event.order_id() {
            self.debug_check_order(order_id);
        }
    }

    /// Insert a new order at the tail of its level. A live order with the
    /// same id is cancelled first.
    pub fn on_add(&mut self, order_id: u64, side: Side, price: Decimal, size: Decimal, ts: i64) {
        if self.orders.contains_key(&order_id) {
            trace!(order_id, "Duplicate add, replacing resting order");
            self.on_cancel(order_id);
        }

        if size <= Decimal::ZERO {
            trace!(order_id, size = %size, "Add without positive size, not resting");
            return;
        }

        if !self.side_mut(side).insert(order_id, price, size) {
            trace!(order_id, price = %price, size = %size, "Level would overflow, add ignored");
            return;
        }
        self.orders.insert(
            order_id,
            Order {
                order_id,
                side,
                price,
                size,
                ts,
            },
        );
    }

    /// Change price and/or size. A price change moves the order to the tail
    /// of the new level; a size-only change keeps its queue position.
    pub fn on_modify(&mut self, order_id: u64, new_price: Decimal, new_size: Decimal, ts: i64) {
        let Some(order) = self.orders.get(&order_id) else {
            trace!(order_id, "Modify for unknown order");
            return;
        };
        let (side, old_price) = (order.side, order.price);

        if new_size <= Decimal::ZERO {
            trace!(order_id, "Modify to non-positive size, removing order");
            self.on_cancel(order_id);
            return;
        }

        let book_side = self.side_mut(side);
        if new_price != old_price {
            if !book_side.can_insert(new_price, new_size) {
                trace!(order_id, price = %new_price, "Level would overflow, modify ignored");
                return;
            }
            book_side.remove(order_id, old_price);
            book_side.insert(order_id, new_price, new_size);
        } else if book_side.resize(order_id, old_price, new_size).is_none() {
            trace!(order_id, size = %new_size, "Level would overflow, modify ignored");
            return;
        }

        if let Some(order) = self.orders.get_mut(&order_id) {
            order.price = new_price;
            order.size = new_size;
            order.ts = ts;
        }
    }

    /// Remove an order entirely. Unknown ids are ignored.
    pub fn on_cancel(&mut self, order_id: u64) {
        let Some(order) = self.orders.remove(&order_id) else {
            return;
        };
        self.side_mut(order.side).remove(order_id, order.price);
    }

    /// Reduce an order by an executed quantity; removes it once nothing
    /// remains. Trades and fills both land here.
    pub fn on_trade(&mut self, order_id: u64, executed: Decimal, ts: i64) {
        if executed <= Decimal::ZERO {
            trace!(order_id, executed = %executed, "Ignoring non-positive execution");
            return;
        }
        let Some(order) = self.orders.get_mut(&order_id) else {
            trace!(order_id, "Execution for unknown order");
            return;
        };

        order.size -= executed;
        order.ts = ts;
        let (side, price, remaining) = (order.side, order.price, order.size);

        if remaining <= Decimal::ZERO {
            self.on_cancel(order_id);
        } else {
            self.side_mut(side).resize(order_id, price, remaining);
        }
    }

    /// Drop every order on both sides
    pub fn on_clear(&mut self) {
        self.orders.clear();
        self.bids.clear();
        self.asks.clear();
    }

    /// Top `depth` aggregated levels on each side
    pub fn snapshot(&self, depth: usize) -> BookDepth {
        BookDepth {
            bids: self.bids.top(depth),
            asks: self.asks.top(depth),
        }
    }

    /// Snapshot stamped with the instrument and the last event time
    pub fn depth_snapshot(&self, depth: usize) -> DepthSnapshot {
        let BookDepth { bids, asks } = self.snapshot(depth);
        DepthSnapshot {
            instrument: self.instrument.clone(),
            timestamp: self.last_ts,
            bids,
            asks,
        }
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best()
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best()
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.checked_add(ask)?.checked_div(Decimal::from(2)),
            _ => None,
        }
    }

    /// Get spread in basis points
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask(), self.mid_price()) {
            (Some(bid), Some(ask), Some(mid)) if mid > Decimal::ZERO => ask
                .checked_sub(bid)?
                .checked_div(mid)?
                .checked_mul(Decimal::from(10000)),
            _ => None,
        }
    }

    pub fn order(&self, order_id: u64) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Order ids resting at a price, in time priority
    pub fn orders_at(&self, side: Side, price: Decimal) -> Vec<u64> {
        self.side(side)
            .level(price)
            .map(|level| level.order_ids())
            .unwrap_or_default()
    }

    pub fn last_ts(&self) -> i64 {
        self.last_ts
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    /// Full cross-check of the order index against both sides.
    ///
    /// Every indexed order must be queued at its price on its side with its
    /// size, every queued id must be indexed, and every level must be
    /// non-empty with a correct cached total.
    pub fn check_consistency(&self) -> Result<()> {
        for order in self.orders.values() {
            let level = self.side(order.side).level(order.price).ok_or_else(|| {
                BookError::InconsistentState(format!(
                    "order {} has no level at {} on {:?}",
                    order.order_id, order.price, order.side
                ))
            })?;
            match level.size_of(order.order_id) {
                Some(size) if size == order.size => {}
                Some(size) => {
                    return Err(BookError::InconsistentState(format!(
                        "order {} size {} but level holds {}",
                        order.order_id, order.size, size
                    )))
                }
                None => {
                    return Err(BookError::InconsistentState(format!(
                        "order {} missing from level {}",
                        order.order_id, order.price
                    )))
                }
            }
            if order.size <= Decimal::ZERO {
                return Err(BookError::InconsistentState(format!(
                    "order {} rests with size {}",
                    order.order_id, order.size
                )));
            }
        }

        let mut queued = 0usize;
        for book_side in [&self.bids, &self.asks] {
            for (price, level) in book_side.iter() {
                if level.is_empty() {
                    return Err(BookError::InconsistentState(format!(
                        "empty level retained at {price}"
                    )));
                }
                level.verify_invariant().map_err(|e| {
                    BookError::InconsistentState(format!("level {price}: {e}"))
                })?;
                for (order_id, _) in level.iter() {
                    match self.orders.get(&order_id) {
                        Some(o) if o.side == book_side.side() && o.price == price => {}
                        _ => {
                            return Err(BookError::InconsistentState(format!(
                                "level {price} queues order {order_id} not indexed there"
                            )))
                        }
                    }
                }
                queued += level.order_count();
            }
        }

        if queued != self.orders.len() {
            return Err(BookError::InconsistentState(format!(
                "{queued} queued orders but {} indexed",
                self.orders.len()
            )));
        }
        Ok(())
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Cheap per-event check on the order an event touched.
    #[cfg(debug_assertions)]
    fn debug_check_order(&self, order_id: u64) {
        if let Some(order) = self.orders.get(&order_id) {
            let queued = self
                .side(order.side)
                .level(order.price)
                .and_then(|level| level.size_of(order_id));
            debug_assert_eq!(
                queued,
                Some(order.size),
                "order {order_id} out of sync with its price level"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Level;
    use rust_decimal_macros::dec;

    fn lvl(price: Decimal, quantity: Decimal) -> Level {
        Level { price, quantity }
    }

    fn create_test_book() -> OrderBook {
        let mut book = OrderBook::new("CLX5");
        book.on_add(1, Side::Buy, dec!(100.00), dec!(10), 1);
        book.on_add(2, Side::Buy, dec!(100.00), dec!(5), 2);
        book.on_add(3, Side::Sell, dec!(101.00), dec!(7), 3);
        book
    }

    #[test]
    fn test_round_trip_snapshot() {
        let book = create_test_book();
        let depth = book.snapshot(10);
        assert_eq!(depth.bids, vec![lvl(dec!(100.00), dec!(15))]);
        assert_eq!(depth.asks, vec![lvl(dec!(101.00), dec!(7))]);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_modify_price_moves_level() {
        let mut book = create_test_book();
        book.on_modify(1, dec!(99.50), dec!(10), 4);

        let depth = book.snapshot(10);
        assert_eq!(
            depth.bids,
            vec![lvl(dec!(100.00), dec!(5)), lvl(dec!(99.50), dec!(10))]
        );
        assert_eq!(book.orders_at(Side::Buy, dec!(99.50)), vec![1]);
        assert_eq!(book.orders_at(Side::Buy, dec!(100.00)), vec![2]);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_modify_price_goes_to_tail() {
        let mut book = create_test_book();
        book.on_add(4, Side::Buy, dec!(99.50), dec!(1), 4);
        book.on_modify(1, dec!(99.50), dec!(10), 5);
        assert_eq!(book.orders_at(Side::Buy, dec!(99.50)), vec![4, 1]);
    }

    #[test]
    fn test_size_only_modify_keeps_priority() {
        let mut book = create_test_book();
        book.on_modify(1, dec!(100.00), dec!(3), 4);
        assert_eq!(book.orders_at(Side::Buy, dec!(100.00)), vec![1, 2]);
        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100.00), dec!(8))]);
        assert_eq!(book.order(1).map(|o| o.ts), Some(4));
    }

    #[test]
    fn test_trade_to_zero_removes_order_and_level() {
        let mut book = create_test_book();
        book.on_modify(1, dec!(99.50), dec!(10), 4);
        book.on_trade(2, dec!(5), 5);

        assert!(book.order(2).is_none());
        let depth = book.snapshot(10);
        assert_eq!(depth.bids, vec![lvl(dec!(99.50), dec!(10))]);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_partial_trade_conserves_quantity() {
        let mut book = create_test_book();
        book.on_trade(1, dec!(4), 4);
        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100.00), dec!(11))]);
        assert_eq!(book.order(1).map(|o| o.size), Some(dec!(6)));
        // partial fill does not lose priority
        assert_eq!(book.orders_at(Side::Buy, dec!(100.00)), vec![1, 2]);
    }

    #[test]
    fn test_trade_sequence_removes_order_at_original_size() {
        let mut book = create_test_book();

        book.apply(&BookEvent::Trade {
            order_id: 1,
            quantity: dec!(4),
            ts: 4,
        });
        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100.00), dec!(11))]);
        assert_eq!(book.order(1).map(|o| o.size), Some(dec!(6)));

        book.apply(&BookEvent::Fill {
            order_id: 1,
            quantity: dec!(6),
            ts: 5,
        });
        assert!(book.order(1).is_none());
        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100.00), dec!(5))]);
        assert_eq!(book.orders_at(Side::Buy, dec!(100.00)), vec![2]);
        assert!(book.check_consistency().is_ok());
    }

    fn huge() -> Decimal {
        Decimal::from_str_exact("50000000000000000000000000000").unwrap()
    }

    #[test]
    fn test_add_overflowing_level_is_ignored() {
        let mut book = OrderBook::new("CLX5");
        book.on_add(1, Side::Buy, dec!(100), huge(), 1);
        book.on_add(2, Side::Buy, dec!(100), huge(), 2);

        assert!(book.order(2).is_none());
        assert_eq!(book.orders_at(Side::Buy, dec!(100)), vec![1]);
        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100), huge())]);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_modify_overflowing_level_is_ignored() {
        let mut book = OrderBook::new("CLX5");
        book.on_add(1, Side::Buy, dec!(100), huge(), 1);
        book.on_add(2, Side::Buy, dec!(99), dec!(1), 2);
        book.on_add(3, Side::Buy, dec!(99), dec!(1), 3);

        // price move into a full level
        book.on_modify(2, dec!(100), huge(), 4);
        book.on_modify(3, dec!(99), dec!(2), 6);
        // size-only change that would overflow its own level
        book.on_modify(3, dec!(99), Decimal::MAX, 7);

        assert_eq!(book.order(1).map(|o| o.size), Some(huge()));
        assert_eq!(book.order(2).map(|o| o.price), Some(dec!(99)));
        assert_eq!(book.order(3).map(|o| o.size), Some(dec!(2)));
        assert_eq!(book.orders_at(Side::Buy, dec!(99)), vec![2, 3]);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_mid_and_spread_do_not_overflow() {
        let mut book = OrderBook::new("CLX5");
        let bid = Decimal::from_str_exact("70000000000000000000000000000").unwrap();
        book.on_add(1, Side::Buy, bid, dec!(1), 1);
        book.on_add(2, Side::Sell, Decimal::MAX, dec!(1), 2);
        assert_eq!(book.mid_price(), None);
        assert_eq!(book.spread_bps(), None);
    }

    #[test]
    fn test_overfill_removes_order() {
        let mut book = create_test_book();
        book.on_trade(3, dec!(50), 4);
        assert!(book.snapshot(10).asks.is_empty());
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_non_positive_execution_ignored() {
        let mut book = create_test_book();
        book.on_trade(3, dec!(-2), 4);
        book.on_trade(3, Decimal::ZERO, 5);
        assert_eq!(book.order(3).map(|o| o.size), Some(dec!(7)));
    }

    #[test]
    fn test_cancel_idempotent() {
        let mut book = create_test_book();
        book.on_cancel(2);
        let once = book.snapshot(10);
        book.on_cancel(2);
        assert_eq!(book.snapshot(10), once);
        assert_eq!(book.order_count(), 2);
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut book = create_test_book();
        let before = book.snapshot(10);
        book.on_modify(99, dec!(1), dec!(1), 4);
        book.on_cancel(99);
        book.on_trade(99, dec!(1), 5);
        assert_eq!(book.snapshot(10), before);
        assert_eq!(book.order_count(), 3);
    }

    #[test]
    fn test_duplicate_add_replaces() {
        let mut book = create_test_book();
        book.on_add(1, Side::Sell, dec!(102.00), dec!(2), 4);

        assert_eq!(book.snapshot(10).bids, vec![lvl(dec!(100.00), dec!(5))]);
        assert_eq!(
            book.snapshot(10).asks,
            vec![lvl(dec!(101.00), dec!(7)), lvl(dec!(102.00), dec!(2))]
        );
        assert_eq!(book.order(1).map(|o| o.side), Some(Side::Sell));
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_duplicate_add_same_level_loses_priority() {
        let mut book = create_test_book();
        book.on_add(1, Side::Buy, dec!(100.00), dec!(10), 4);
        assert_eq!(book.orders_at(Side::Buy, dec!(100.00)), vec![2, 1]);
    }

    #[test]
    fn test_zero_size_add_does_not_rest() {
        let mut book = OrderBook::new("CLX5");
        book.on_add(1, Side::Buy, dec!(100), Decimal::ZERO, 1);
        assert!(book.is_empty());
        assert!(book.snapshot(10).bids.is_empty());
    }

    #[test]
    fn test_modify_to_zero_removes() {
        let mut book = create_test_book();
        book.on_modify(3, dec!(101.00), Decimal::ZERO, 4);
        assert!(book.order(3).is_none());
        assert!(book.snapshot(10).asks.is_empty());
        assert!(book.check_consistency().is_ok());
    }

    #[test]
    fn test_clear_empties_book() {
        let mut book = create_test_book();
        book.apply(&BookEvent::Clear { ts: 9 });
        let depth = book.snapshot(10);
        assert!(depth.bids.is_empty());
        assert!(depth.asks.is_empty());
        assert!(book.is_empty());
        assert_eq!(book.last_ts(), 9);

        book.on_add(7, Side::Sell, dec!(103), dec!(1), 10);
        assert_eq!(book.snapshot(10).asks, vec![lvl(dec!(103), dec!(1))]);
    }

    #[test]
    fn test_apply_dispatch_and_timestamp() {
        let mut book = OrderBook::new("CLX5");
        book.apply(&BookEvent::Add {
            order_id: 1,
            side: Side::Sell,
            price: dec!(101),
            size: dec!(7),
            ts: 10,
        });
        book.apply(&BookEvent::Fill {
            order_id: 1,
            quantity: dec!(2),
            ts: 11,
        });
        book.apply(&BookEvent::Cancel { order_id: 5, ts: 12 });

        assert_eq!(book.order(1).map(|o| (o.size, o.ts)), Some((dec!(5), 11)));
        assert_eq!(book.last_ts(), 12);
        assert_eq!(book.events_applied(), 3);

        let snapshot = book.depth_snapshot(10);
        assert_eq!(snapshot.instrument, "CLX5");
        assert_eq!(snapshot.timestamp, 12);
    }

    #[test]
    fn test_best_prices_and_spread() {
        let book = create_test_book();
        assert_eq!(book.best_bid(), Some(dec!(100.00)));
        assert_eq!(book.best_ask(), Some(dec!(101.00)));
        assert_eq!(book.mid_price(), Some(dec!(100.5)));
        assert!(book.spread_bps().unwrap() > Decimal::ZERO);
        assert!(OrderBook::new("X").mid_price().is_none());
    }

    #[test]
    fn test_snapshot_depth_and_ordering() {
        let mut book = OrderBook::new("CLX5");
        for i in 0..30u64 {
            book.on_add(i, Side::Buy, Decimal::from(100 - i as i64), dec!(1), i as i64);
            book.on_add(100 + i, Side::Sell, Decimal::from(101 + i), dec!(1), i as i64);
        }
        let depth = book.snapshot(10);
        assert_eq!(depth.bids.len(), 10);
        assert_eq!(depth.asks.len(), 10);
        assert!(depth.bids.windows(2).all(|w| w[0].price > w[1].price));
        assert!(depth.asks.windows(2).all(|w| w[0].price < w[1].price));
        assert_eq!(depth.bids[0].price, dec!(100));
        assert_eq!(depth.asks[0].price, dec!(101));
    }
}
