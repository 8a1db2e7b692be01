//! Paper trading venue
//!
//! Stands in for a real exchange integration: same [`treasury_ports::VenueAdapter`]
//! surface, state kept in memory.

mod venue;

pub use venue::{PaperOrder, PaperVenue, VenueCall};
