//! Error types for the execution router

use thiserror::Error;
use treasury_core::{Quantity, Symbol};
use treasury_ports::VenueError;

/// Why an execution session was aborted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Subscription failed: {0}")]
    Subscribe(VenueError),

    #[error("Order book feed lost for {symbol}")]
    BookFeedLost { symbol: Symbol },

    #[error("Order status feed lost for {symbol}")]
    StatusFeedLost { symbol: Symbol },

    #[error("Venue call task failed: {0}")]
    TaskFailed(String),

    #[error("Nothing tradable for {symbol}: {quantity} is below the minimum order size")]
    BelowMinimumSize { symbol: Symbol, quantity: Quantity },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
