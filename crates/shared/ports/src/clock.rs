use treasury_core::Timestamp;

/// Port for time abstraction
///
/// Feed bookkeeping stamps `last_update` through this trait so tests can
/// pin time instead of reading the wall clock.
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}
