//! Treasury Ports
//!
//! Port definitions (traits) for the treasury daemon.
//! These define the boundaries between domain logic and infrastructure:
//! the venue adapter every exchange integration implements, and the clock.

mod clock;
mod error;
mod venue;

pub use clock::Clock;
pub use error::{VenueError, VenueResult};
pub use venue::VenueAdapter;
