//! Treasury Clock Infrastructure
//!
//! Time sources behind the [`Clock`] port:
//!
//! - [`SystemClock`] reads wall-clock UTC (production)
//! - [`ManualClock`] only moves when told to (deterministic tests)
//!
//! ## Usage
//!
//! ```ignore
//! use treasury_clock::{Clock, ManualClock};
//! use chrono::Duration;
//!
//! let clock = ManualClock::default();
//! let t0 = clock.now();
//! clock.advance(Duration::seconds(5));
//! assert_eq!(clock.now() - t0, Duration::seconds(5));
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use treasury_ports::Clock;
