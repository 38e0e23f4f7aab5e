//! Timestamp source for scan results.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Wall clock that never goes backwards.
///
/// Results from one session carry non-decreasing timestamps even if the
/// system clock is stepped back between scans.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    /// Creates a new clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current time, clamped to the last value handed out.
    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}
