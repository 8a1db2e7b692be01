use thiserror::Error;

/// Errors surfaced by a venue adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    /// Order refused, e.g. a post-only order that would have crossed
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl VenueError {
    /// Transient errors are retried by the caller on its next attempt;
    /// everything else ends the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, VenueError::Rejected(_) | VenueError::RateLimited(_))
    }
}

pub type VenueResult<T> = std::result::Result<T, VenueError>;
