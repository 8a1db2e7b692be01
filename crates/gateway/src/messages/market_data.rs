//! Market data message types delivered by venue feeds

use serde::{Deserialize, Serialize};
use treasury_core::{Price, Quantity, Symbol, Timestamp, VenueId};

/// Last traded / mark price for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: Timestamp,
}

impl PriceTick {
    pub fn new(venue: VenueId, symbol: impl Into<Symbol>, price: Price, timestamp: Timestamp) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// Wallet balance of one asset on one venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub venue: VenueId,
    pub asset: String,
    pub total: Quantity,
    pub timestamp: Timestamp,
}

impl BalanceUpdate {
    pub fn new(venue: VenueId, asset: impl Into<String>, total: Quantity, timestamp: Timestamp) -> Self {
        Self {
            venue,
            asset: asset.into().to_uppercase(),
            total,
            timestamp,
        }
    }
}
