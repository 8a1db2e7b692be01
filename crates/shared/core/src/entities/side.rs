use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::Price;

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// True when `candidate` is a strictly better price to rest at than
    /// `current` for this side. Buyers improve upward, sellers downward.
    pub fn improves(&self, current: Price, candidate: Price) -> bool {
        match self {
            Side::Buy => current < candidate,
            Side::Sell => current > candidate,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}
