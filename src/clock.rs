use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for expiry and lockout decisions.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for `lastLogin` stamps
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
