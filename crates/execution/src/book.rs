//! Local order book built from venue snapshots and deltas

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use treasury_core::{BookLevel, BookUpdate, Price, Side};

/// Single-owner order book keyed by venue order id
///
/// Venue feeds identify levels by id, and a delete carries only the id, so
/// the book remembers which side and price every id was last seen at. A
/// per-side price index keeps best-price queries at O(log n).
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    entries: HashMap<i64, (Side, Price)>,
    /// price -> number of ids resting at that price
    bids: BTreeMap<Price, usize>,
    asks: BTreeMap<Price, usize>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book
    pub fn apply_snapshot(&mut self, levels: &[BookLevel]) {
        self.clear();
        for level in levels {
            self.upsert(level);
        }
    }

    /// Deletes are applied before inserts. Inserts upsert by id, so a reused
    /// id moves to its new price or side.
    pub fn apply_delta(&mut self, inserts: &[BookLevel], deletes: &[i64]) {
        for id in deletes {
            self.remove(*id);
        }
        for level in inserts {
            self.upsert(level);
        }
    }

    pub fn apply(&mut self, update: &BookUpdate) {
        match update {
            BookUpdate::Snapshot { levels } => self.apply_snapshot(levels),
            BookUpdate::Delta { inserts, deletes } => self.apply_delta(inserts, deletes),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bids.clear();
        self.asks.clear();
    }

    // === Price Queries ===

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Best price on the given side of the book
    pub fn best(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    /// Price a maker order on `side` should rest at.
    ///
    /// Buyers join the best bid, never above `limit`; sellers join the best
    /// ask, never below `limit`. `None` until that side has a level.
    pub fn quotable(&self, side: Side, limit: Option<Price>) -> Option<Price> {
        let best = self.best(side)?;
        Some(match (side, limit) {
            (Side::Buy, Some(limit)) => best.min(limit),
            (Side::Sell, Some(limit)) => best.max(limit),
            (_, None) => best,
        })
    }

    // === Level Queries ===

    pub fn level_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, order_id: i64) -> bool {
        self.entries.contains_key(&order_id)
    }

    fn upsert(&mut self, level: &BookLevel) {
        if level.price <= Price::ZERO {
            log::debug!("Skipping level {} with price {}", level.order_id, level.price);
            return;
        }
        self.remove(level.order_id);
        self.entries
            .insert(level.order_id, (level.side, level.price));
        *self.index_mut(level.side).entry(level.price).or_insert(0) += 1;
    }

    fn remove(&mut self, order_id: i64) {
        let Some((side, price)) = self.entries.remove(&order_id) else {
            return;
        };
        let index = self.index_mut(side);
        if let Some(count) = index.get_mut(&price) {
            *count -= 1;
            if *count == 0 {
                index.remove(&price);
            }
        }
    }

    fn index_mut(&mut self, side: Side) -> &mut BTreeMap<Price, usize> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

/// Shared handle to an [`OrderBook`]
///
/// The best-price watcher writes, the chase loop reads; a read never sees a
/// half-applied update.
#[derive(Debug, Clone, Default)]
pub struct LocalOrderBook {
    inner: Arc<RwLock<OrderBook>>,
}

impl LocalOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&self, levels: &[BookLevel]) {
        self.inner.write().apply_snapshot(levels);
    }

    pub fn apply_delta(&self, inserts: &[BookLevel], deletes: &[i64]) {
        self.inner.write().apply_delta(inserts, deletes);
    }

    pub fn apply(&self, update: &BookUpdate) {
        self.inner.write().apply(update);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.inner.read().best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.inner.read().best_ask()
    }

    pub fn best(&self, side: Side) -> Option<Price> {
        self.inner.read().best(side)
    }

    pub fn quotable(&self, side: Side, limit: Option<Price>) -> Option<Price> {
        self.inner.read().quotable(side, limit)
    }

    pub fn level_count(&self) -> usize {
        self.inner.read().level_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
