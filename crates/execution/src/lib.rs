//! Treasury Execution
//!
//! Works one sized order on one venue: rests a post-only order at the best
//! price on our side of the book and re-prices it whenever the market moves
//! in our favour, until the target quantity is filled.
//!
//! ## Architecture
//!
//! ```text
//!          Venue Adapter
//!     ┌───────┴─────────────────┐
//!     │ order book              │ order status
//! ┌───▼──────────┐      ┌───────▼────────┐
//! │ BookWatcher  │      │ StatusWatcher  │── fills ──► QuantityTracker
//! │ (own task)   │      │ (own task)     │
//! └───┬──────────┘      └───────┬────────┘
//!     │ LocalOrderBook          │ filled / cancelled
//!     │ + first-quote oneshot   │
//! ┌───▼─────────────────────────▼──┐
//! │ ExecutionSession (10ms ticks)  │── place / edit / cancel_all ──► Venue
//! └────────────────────────────────┘   (each call on its own task)
//! ```
//!
//! Venues that support amendments get `edit_order`; the rest get
//! `cancel_all` followed by a fresh placement once the cancel is confirmed.

pub mod book;
pub mod config;
pub mod error;
pub mod quantity;
pub mod request;
pub mod router;
mod session;
mod watchers;

pub use book::{LocalOrderBook, OrderBook};
pub use config::RouterConfig;
pub use error::{ExecutionError, Result};
pub use quantity::{QuantitySpec, QuantityTracker};
pub use request::{ExecutionOutcome, ExecutionReport, ExecutionRequest};
pub use router::ExecutionRouter;
