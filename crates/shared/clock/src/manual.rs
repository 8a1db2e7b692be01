use chrono::{Duration, TimeZone, Utc};
use parking_lot::RwLock;
use treasury_core::Timestamp;
use treasury_ports::Clock;

/// Clock that only moves when told to
///
/// Shareable behind an `Arc`; `advance` and `set` take `&self`.
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move time forward (negative durations are ignored)
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            *self.now.write() += by;
        }
    }

    pub fn set(&self, at: Timestamp) {
        *self.now.write() = at;
    }
}

impl Default for ManualClock {
    /// Starts at 2024-01-01T00:00:00Z
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }

    fn name(&self) -> &str {
        "manual"
    }
}
