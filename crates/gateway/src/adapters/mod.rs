//! Venue adapters
//!
//! Each adapter implements [`treasury_ports::VenueAdapter`] for one
//! exchange. Signing and payload mapping stay inside the adapter.

pub mod paper;

pub use paper::{PaperOrder, PaperVenue, VenueCall};
