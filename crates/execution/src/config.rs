//! Router configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use treasury_feed::BackoffPolicy;

fn default_tick_interval_ms() -> u64 {
    10
}

fn default_book_resubscribe() -> BackoffPolicy {
    BackoffPolicy::new(3, 2.0, Duration::from_millis(100))
}

/// Execution router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Price-chase loop period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// A remainder at or below this is treated as complete
    #[serde(default)]
    pub min_order_size: Decimal,

    /// Order quantities are rounded down to this step
    #[serde(default)]
    pub lot_size: Option<Decimal>,

    /// Order-book resubscription after the stream drops
    #[serde(default = "default_book_resubscribe")]
    pub book_resubscribe: BackoffPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_order_size: Decimal::ZERO,
            lot_size: None,
            book_resubscribe: default_book_resubscribe(),
        }
    }
}

impl RouterConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn with_min_order_size(mut self, size: Decimal) -> Self {
        self.min_order_size = size;
        self
    }

    pub fn with_lot_size(mut self, lot: Decimal) -> Self {
        self.lot_size = Some(lot);
        self
    }

    pub fn with_book_resubscribe(mut self, policy: BackoffPolicy) -> Self {
        self.book_resubscribe = policy;
        self
    }
}
