//! FIFO price level with O(1) removal by order id.
//!
//! Orders at one price form a doubly-linked queue threaded through a hash
//! map keyed by order id: the map gives O(1) lookup, the links give arrival
//! order. The aggregate size is cached.
//!
//! # Invariant
//!
//! `total` MUST equal the sum of all node sizes, and following `next` from
//! `head` visits every node exactly once, ending at `tail`. Checked in debug
//! builds via `verify_invariant()` in tests and by the book's consistency
//! checker.
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `insert` | O(1) amortized |
//! | `remove` | O(1) amortized |
//! | `resize` | O(1) |
//! | `aggregate_quantity` | O(1) |

use ahash::AHashMap;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
struct Node {
    size: Decimal,
    prev: Option<u64>,
    next: Option<u64>,
}

/// Resting orders at one exact price, oldest first.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    nodes: AHashMap<u64, Node>,
    head: Option<u64>,
    tail: Option<u64>,
    total: Decimal,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the tail (newest time priority).
    ///
    /// Returns `false` and leaves the level untouched if the id is already
    /// queued here or the aggregate would overflow.
    pub fn insert(&mut self, order_id: u64, size: Decimal) -> bool {
        if self.nodes.contains_key(&order_id) {
            return false;
        }
        let Some(total) = self.total.checked_add(size) else {
            return false;
        };

        let node = Node {
            size,
            prev: self.tail,
            next: None,
        };
        match self.tail {
            Some(tail) => {
                if let Some(last) = self.nodes.get_mut(&tail) {
                    last.next = Some(order_id);
                }
            }
            None => self.head = Some(order_id),
        }
        self.tail = Some(order_id);
        self.nodes.insert(order_id, node);
        self.total = total;
        true
    }

    /// Unlink an order wherever it sits in the queue.
    ///
    /// Returns the size it was carrying, or `None` if it was not here.
    pub fn remove(&mut self, order_id: u64) -> Option<Decimal> {
        let node = self.nodes.remove(&order_id)?;

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.nodes.get_mut(&prev) {
                    p.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(n) = self.nodes.get_mut(&next) {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.total -= node.size;
        Some(node.size)
    }

    /// Change an order's size in place, keeping its queue position.
    ///
    /// Returns the previous size, or `None` if the order is not here or the
    /// aggregate would overflow. Either way the level is unchanged on `None`.
    pub fn resize(&mut self, order_id: u64, size: Decimal) -> Option<Decimal> {
        let node = self.nodes.get_mut(&order_id)?;
        let old = node.size;
        let total = self.total.checked_sub(old)?.checked_add(size)?;
        node.size = size;
        self.total = total;
        Some(old)
    }

    /// Whether an order of `size` fits under the aggregate limit.
    pub fn can_absorb(&self, size: Decimal) -> bool {
        self.total.checked_add(size).is_some()
    }

    /// Sum of the sizes of all resting orders (cached).
    #[inline]
    pub fn aggregate_quantity(&self) -> Decimal {
        self.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.nodes.len()
    }

    /// Size recorded for an order at this level.
    pub fn size_of(&self, order_id: u64) -> Option<Decimal> {
        self.nodes.get(&order_id).map(|n| n.size)
    }

    /// Oldest order in the queue.
    pub fn front(&self) -> Option<u64> {
        self.head
    }

    /// Iterate `(order_id, size)` in time priority.
    pub fn iter(&self) -> LevelIter<'_> {
        LevelIter {
            level: self,
            cursor: self.head,
        }
    }

    /// Order ids in time priority.
    pub fn order_ids(&self) -> Vec<u64> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Walk the links and recompute the total, checking both against the
    /// cached state.
    pub fn verify_invariant(&self) -> std::result::Result<(), String> {
        let mut visited = 0usize;
        let mut sum = Decimal::ZERO;
        let mut prev: Option<u64> = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| format!("dangling link to order {id}"))?;
            if node.prev != prev {
                return Err(format!("order {id} has a broken back link"));
            }
            visited += 1;
            if visited > self.nodes.len() {
                return Err("cycle in level queue".to_string());
            }
            sum += node.size;
            prev = Some(id);
            cursor = node.next;
        }

        if prev != self.tail {
            return Err("tail does not match last queued order".to_string());
        }
        if visited != self.nodes.len() {
            return Err(format!(
                "queue reaches {visited} of {} orders",
                self.nodes.len()
            ));
        }
        if sum != self.total {
            return Err(format!("cached total {} != actual {sum}", self.total));
        }
        Ok(())
    }
}

/// Iterator over a level in time priority.
pub struct LevelIter<'a> {
    level: &'a PriceLevel,
    cursor: Option<u64>,
}

impl Iterator for LevelIter<'_> {
    type Item = (u64, Decimal);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.level.nodes.get(&id)?;
        self.cursor = node.next;
        Some((id, node.size))
    }
}
