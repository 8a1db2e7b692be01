//! Treasury Gateway
//!
//! Venue-facing layer of the treasury daemon. Provides:
//! - Venue adapters implementing [`treasury_ports::VenueAdapter`]
//! - Normalized market data messages (prices, balances)
//! - Ticker producers that feed those messages to the feed supervisor
//!
//! ## Architecture
//!
//! ```text
//! External World (Bybit, Deribit, Binance, Paper)
//!         │
//!    ┌────▼────┐
//!    │ Adapter │  signing, payload mapping, websocket framing
//!    └────┬────┘
//!         │ mpsc streams:
//!         │ order book, order status, prices, balances
//!    ┌────▼──────────────┐
//!    │ Feed Supervisor / │
//!    │ Execution Router  │
//!    └───────────────────┘
//! ```

pub mod adapters;
pub mod messages;
pub mod tickers;

// Re-export commonly used types
pub use adapters::{PaperOrder, PaperVenue, VenueCall};
pub use messages::{BalanceUpdate, PriceTick};
pub use tickers::{BalanceTicker, PriceTicker, TickerConfig};
