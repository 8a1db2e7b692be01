//! Treasury Core Domain
//!
//! Pure domain types shared by the feed supervisor, the execution router
//! and the venue adapters. This crate contains no async and no I/O.

pub mod entities;
pub mod ids;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    BookLevel, BookUpdate, OrderId, OrderRequest, OrderState, OrderUpdate, Side,
};
pub use ids::{FeedId, VenueId};
pub use values::{Price, Quantity, Symbol, Timestamp};
