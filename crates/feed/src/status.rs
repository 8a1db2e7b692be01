//! Operator-facing feed status

use serde::Serialize;
use treasury_core::Timestamp;

/// Where a feed is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    /// Stream open (or being opened)
    Running,
    /// Stream ended; sleeping before the next automatic restart
    BackingOff,
    /// Retries used up; waits for `reactivate`
    Exhausted,
    Stopped,
}

/// Snapshot of one feed's health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    /// True once an item has been delivered on the current stream
    pub active: bool,
    pub last_update: Option<Timestamp>,
    /// Stream failures since the last delivered item
    pub consecutive_errors: u32,
    pub phase: FeedPhase,
    /// Automatic plus manual restarts over the feed's lifetime
    pub restarts: u64,
}

impl FeedStatus {
    pub(crate) fn starting() -> Self {
        Self {
            active: false,
            last_update: None,
            consecutive_errors: 0,
            phase: FeedPhase::Running,
            restarts: 0,
        }
    }

    /// Whether `reactivate` would restart this feed right away
    pub fn is_reactivatable(&self) -> bool {
        matches!(self.phase, FeedPhase::BackingOff | FeedPhase::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_for_operators() {
        let mut status = FeedStatus::starting();
        status.phase = FeedPhase::BackingOff;
        status.consecutive_errors = 2;
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "backing_off");
        assert_eq!(json["consecutive_errors"], 2);
        assert_eq!(json["active"], false);
        assert!(json["last_update"].is_null());
    }
}
