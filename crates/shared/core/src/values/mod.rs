use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
/// Base-asset units or quote-asset notional depending on context
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Venue-native instrument symbol, e.g. `BTCUSDT` or `BTC-PERPETUAL`
pub type Symbol = String;
