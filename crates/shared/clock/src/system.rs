use chrono::Utc;
use treasury_core::Timestamp;
use treasury_ports::Clock;

/// Wall-clock UTC, the daemon's default time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_wall_clock() {
        let clock = SystemClock::new();
        let before = Utc::now();
        let now = clock.now();
        assert!(now >= before);
        assert!(now - before < chrono::Duration::seconds(5));
        assert_eq!(clock.name(), "system");
    }
}
