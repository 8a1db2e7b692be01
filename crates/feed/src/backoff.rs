//! Bounded exponential backoff

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_retries() -> u32 {
    6
}

fn default_base() -> f64 {
    2.0
}

fn default_initial_delay_ms() -> u64 {
    1000
}

/// Restart policy shared by the feed supervisor and the execution router's
/// order-book watcher.
///
/// The k-th consecutive restart (1-indexed) waits
/// `initial_delay * base^(k-1)`, optionally capped at `max_delay`. A
/// restart is allowed while `consecutive_errors <= max_retries`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base")]
    pub base: f64,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base: default_base(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: None,
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, base: f64, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            base,
            initial_delay_ms: initial_delay.as_millis() as u64,
            max_delay_ms: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = Some(max_delay.as_millis() as u64);
        self
    }

    /// Whether another automatic restart is allowed after
    /// `consecutive_errors` failures in a row.
    pub fn can_retry(&self, consecutive_errors: u32) -> bool {
        consecutive_errors <= self.max_retries
    }

    /// Delay before the `attempt`-th consecutive restart (1-indexed).
    /// Attempt 0 restarts immediately.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.base.max(1.0).powi(exponent);
        let mut millis = self.initial_delay_ms as f64 * factor;
        if let Some(cap) = self.max_delay_ms {
            millis = millis.min(cap as f64);
        }
        if !millis.is_finite() {
            millis = self.max_delay_ms.unwrap_or(u64::MAX) as f64;
        }
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_doubles_from_one_second() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|k| policy.delay_for(k).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_retry_bound() {
        let policy = BackoffPolicy::default();
        assert!(policy.can_retry(1));
        assert!(policy.can_retry(6));
        assert!(!policy.can_retry(7));
    }

    #[test]
    fn test_max_delay_caps_growth() {
        let policy = BackoffPolicy::new(20, 2.0, Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for(20), Duration::from_secs(1));
    }

    #[test]
    fn test_attempt_zero_is_immediate() {
        assert_eq!(BackoffPolicy::default().delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_deserialize_uses_defaults() {
        let policy: BackoffPolicy = serde_json::from_str(r#"{"max_retries": 3}"#).unwrap();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base, 2.0);
        assert_eq!(policy.initial_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, None);
    }
}
