use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::Price;

/// A single resting order in a venue's order-book feed.
///
/// `order_id` identifies the level within one venue+symbol. Venues that
/// publish aggregated books use a price-derived id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub order_id: i64,
    pub price: Price,
    pub side: Side,
}

impl BookLevel {
    pub fn new(order_id: i64, price: Price, side: Side) -> Self {
        Self {
            order_id,
            price,
            side,
        }
    }

    pub fn bid(order_id: i64, price: Price) -> Self {
        Self::new(order_id, price, Side::Buy)
    }

    pub fn ask(order_id: i64, price: Price) -> Self {
        Self::new(order_id, price, Side::Sell)
    }
}

/// Order-book message as delivered by a venue subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BookUpdate {
    /// Replaces the whole book
    Snapshot { levels: Vec<BookLevel> },
    /// Incremental change; deletes are order ids
    Delta {
        inserts: Vec<BookLevel>,
        deletes: Vec<i64>,
    },
}

impl BookUpdate {
    pub fn snapshot(levels: Vec<BookLevel>) -> Self {
        BookUpdate::Snapshot { levels }
    }

    pub fn delta(inserts: Vec<BookLevel>, deletes: Vec<i64>) -> Self {
        BookUpdate::Delta { inserts, deletes }
    }
}
