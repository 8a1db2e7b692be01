//! Latest market data seen by the daemon's feeds

use dashmap::DashMap;
use std::sync::Arc;
use treasury_core::{Price, Quantity, Timestamp, VenueId};
use treasury_gateway::{BalanceUpdate, PriceTick};

/// Last value of one stream, with its venue timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observed<T> {
    pub value: T,
    pub at: Timestamp,
}

/// Shared store of the most recent price per (venue, symbol) and balance
/// per (venue, asset). Feed consumers write, everyone else reads.
#[derive(Debug, Clone, Default)]
pub struct MarketState {
    prices: Arc<DashMap<(VenueId, String), Observed<Price>>>,
    balances: Arc<DashMap<(VenueId, String), Observed<Quantity>>>,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_price(&self, tick: &PriceTick) {
        self.prices.insert(
            (tick.venue.clone(), tick.symbol.clone()),
            Observed {
                value: tick.price,
                at: tick.timestamp,
            },
        );
    }

    pub fn record_balance(&self, update: &BalanceUpdate) {
        self.balances.insert(
            (update.venue.clone(), update.asset.clone()),
            Observed {
                value: update.total,
                at: update.timestamp,
            },
        );
    }

    pub fn price(&self, venue: &VenueId, symbol: &str) -> Option<Observed<Price>> {
        self.prices
            .get(&(venue.clone(), symbol.to_string()))
            .map(|entry| *entry.value())
    }

    /// Asset names are case-insensitive
    pub fn balance(&self, venue: &VenueId, asset: &str) -> Option<Observed<Quantity>> {
        self.balances
            .get(&(venue.clone(), asset.to_uppercase()))
            .map(|entry| *entry.value())
    }

    pub fn price_count(&self) -> usize {
        self.prices.len()
    }

    pub fn balance_count(&self) -> usize {
        self.balances.len()
    }
}
