//! Treasury Daemon
//!
//! Long-running process that keeps venue market data flowing and works
//! orders through the execution router.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  PriceTick   ┌────────────────┐  record   ┌─────────────┐
//! │ PriceTicker  ├─────────────►│                ├──────────►│ MarketState │
//! └──────────────┘              │ FeedSupervisor │           └─────────────┘
//! ┌──────────────┐ BalanceUpdate│  (backoff,     │  top of book
//! │BalanceTicker ├─────────────►│   reactivate)  ├──────────┐
//! └──────────────┘              └────────────────┘          ▼
//!                                                   ┌──────────────┐
//!   Daemon::execute ──► ExecutionRouter ──────────► │  PaperVenue  │
//!                                                   └──────────────┘
//! ```
//!
//! Configuration comes from a JSON file (see `daemon_config.json` for the
//! embedded default).

pub mod config;
pub mod daemon;
pub mod state;

pub use config::{
    ConfigError, DaemonConfig, FeedConfig, FeedSource, VenueConfig, load_config,
    load_config_from_str, load_default_config,
};
pub use daemon::{Daemon, DaemonError, Result};
pub use state::{MarketState, Observed};
