//! Error types for the feed supervisor

use thiserror::Error;
use treasury_core::FeedId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed already registered: {0}")]
    AlreadyRegistered(FeedId),

    #[error("Feed not found: {0}")]
    NotFound(FeedId),
}

pub type Result<T> = std::result::Result<T, FeedError>;
