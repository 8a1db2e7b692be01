//! Treasury Feed Supervisor
//!
//! Keeps any number of independently named streaming feeds alive. Each feed
//! is one producer (opens a stream) wired to one consumer (handles items).
//! A stream ending is the failure signal; the supervisor restarts the feed
//! with bounded exponential backoff and exposes per-feed status.
//!
//! ## Lifecycle
//!
//! ```text
//!             add()
//!               │
//!          ┌────▼────┐  item: errors=0, active=true, last_update=now
//!     ┌───►│ Running │◄──────────────┐
//!     │    └────┬────┘               │
//!     │         │ stream ended       │
//!     │    ┌────▼─────┐              │
//!     │    │  Failed  │ errors += 1  │
//!     │    └──┬────┬──┘              │
//!     │ errors│    │errors           │
//!     │ ≤ max │    │> max            │
//!     │ ┌─────▼──┐ └──►┌───────────┐ │
//!     └─┤Backing │     │ Exhausted ├─┘ reactivate()
//!       │  Off   │     └───────────┘
//!       └────────┘ sleep base^(k-1)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use treasury_feed::{FeedSupervisor, FeedSupervisorConfig};
//! use tokio::sync::mpsc;
//!
//! let supervisor = FeedSupervisor::with_system_clock(FeedSupervisorConfig::default());
//! supervisor.add("price", || {
//!     let (tx, rx) = mpsc::channel(16);
//!     tokio::spawn(async move { let _ = tx.send(42u64).await; });
//!     rx
//! }, |price: u64| println!("price {price}"))?;
//!
//! for (id, status) in supervisor.status() {
//!     println!("{id}: active={} errors={}", status.active, status.consecutive_errors);
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod status;
pub mod supervisor;
mod task;
pub mod traits;

pub use backoff::BackoffPolicy;
pub use config::FeedSupervisorConfig;
pub use error::{FeedError, Result};
pub use status::{FeedPhase, FeedStatus};
pub use supervisor::FeedSupervisor;
pub use traits::{FeedConsumer, FeedProducer};
