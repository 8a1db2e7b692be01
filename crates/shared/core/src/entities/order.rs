use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;
use crate::values::{Price, Quantity, Symbol};

/// Venue-assigned order identifier
///
/// Venues disagree on the shape (numeric, uuid, prefixed string), so the
/// id is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        OrderId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        OrderId::new(s)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId::new(s)
    }
}

impl From<u64> for OrderId {
    fn from(n: u64) -> Self {
        OrderId::new(n.to_string())
    }
}

/// Order lifecycle state as reported on the order-status stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Accepted and resting
    New,
    PartiallyFilled,
    Filled,
    /// Cancelled by us, by the venue, or rejected after acceptance
    Cancelled,
}

impl OrderState {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Filled | OrderState::Cancelled)
    }
}

/// Order-status event
///
/// `fill_qty` is the amount filled by this event; `cum_fill_qty` is the
/// venue's cumulative filled amount for the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub state: OrderState,
    pub fill_qty: Quantity,
    pub cum_fill_qty: Quantity,
}

impl OrderUpdate {
    pub fn new(
        order_id: impl Into<OrderId>,
        state: OrderState,
        fill_qty: Quantity,
        cum_fill_qty: Quantity,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            state,
            fill_qty,
            cum_fill_qty,
        }
    }
}

/// Limit order submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub reduce_only: bool,
    /// Maker-only; the venue rejects the order instead of crossing
    pub post_only: bool,
}

impl OrderRequest {
    /// Post-only limit order
    pub fn post_only(
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        price: Price,
        reduce_only: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price,
            reduce_only,
            post_only: true,
        }
    }
}
