//! Wall-clock sources for note timestamps

use std::sync::atomic::{AtomicI64, Ordering};

/// Unix timestamp in milliseconds
pub type Timestamp = i64;

/// Source of timestamps for `updated_at` and `saved_at`
///
/// Implementations must be monotonically non-decreasing.
pub trait Clock: Send + Sync {
    /// Current time in Unix ms
    fn now(&self) -> Timestamp;
}

/// System wall clock that never steps backwards
///
/// If the OS clock is adjusted back, the last returned value is repeated
/// until real time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(i64::MIN),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp_millis();
        let previous = self.last.fetch_max(wall, Ordering::AcqRel);
        previous.max(wall)
    }
}

/// Manually driven clock for deterministic tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    current: AtomicI64,
}

impl ManualClock {
    pub const fn new(start: Timestamp) -> Self {
        Self {
            current: AtomicI64::new(start),
        }
    }

    /// Move the clock forward by `delta_ms`
    pub fn advance(&self, delta_ms: i64) {
        self.current.fetch_add(delta_ms.max(0), Ordering::AcqRel);
    }

    /// Jump to `value`; ignored if it would move the clock backwards
    pub fn set(&self, value: Timestamp) {
        self.current.fetch_max(value, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.load(Ordering::Acquire)
    }
}
