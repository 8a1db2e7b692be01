//! Supervisor configuration

use serde::{Deserialize, Serialize};

use crate::BackoffPolicy;

/// Feed supervisor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSupervisorConfig {
    /// Restart policy applied to every feed
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

impl FeedSupervisorConfig {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self { backoff }
    }
}
