//! Advisory lockout after repeated failed logins.
//!
//! Counters are keyed by the raw identifier typed on the login screen and live
//! in tab-lifetime storage only: restarting the console forgets them. This is a
//! UX speed bump, not a security control.

use crate::error::{Error, Result};
use crate::store::{MemoryStore, Slot, SlotExt};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct Attempts {
    failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    locked_until: Option<i64>,
}

pub struct LoginThrottle {
    tab: MemoryStore,
    max_attempts: u32,
    lockout: Duration,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            tab: MemoryStore::new(),
            max_attempts,
            lockout,
        }
    }

    fn load(&self) -> Result<HashMap<String, Attempts>> {
        Ok(self.tab.read(Slot::LoginAttempts)?.unwrap_or_default())
    }

    fn save(&mut self, attempts: &HashMap<String, Attempts>) -> Result<()> {
        self.tab.write(Slot::LoginAttempts, attempts)
    }

    /// Refuse the attempt if `identifier` is locked; clears locks that have run out
    pub fn check(&mut self, identifier: &str, now_ms: i64) -> Result<()> {
        let mut attempts = self.load()?;
        let Some(entry) = attempts.get(identifier) else {
            return Ok(());
        };
        match entry.locked_until {
            Some(until) if until > now_ms => Err(locked_out(until)),
            Some(_) => {
                attempts.remove(identifier);
                self.save(&attempts)
            }
            None => Ok(()),
        }
    }

    /// Count a failed attempt. Returns `LockedOut` when this failure trips the limit.
    pub fn record_failure(&mut self, identifier: &str, now_ms: i64) -> Result<()> {
        let mut attempts = self.load()?;
        let entry = attempts.entry(identifier.to_string()).or_default();
        entry.failures += 1;

        let mut tripped = None;
        if entry.failures >= self.max_attempts {
            let until = now_ms.saturating_add(self.lockout.num_milliseconds());
            entry.locked_until = Some(until);
            tripped = Some(until);
        }
        self.save(&attempts)?;

        match tripped {
            Some(until) => Err(locked_out(until)),
            None => Ok(()),
        }
    }

    pub fn record_success(&mut self, identifier: &str) -> Result<()> {
        let mut attempts = self.load()?;
        if attempts.remove(identifier).is_some() {
            self.save(&attempts)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn failures(&self, identifier: &str) -> Result<u32> {
        Ok(self.load()?.get(identifier).map_or(0, |a| a.failures))
    }
}

fn locked_out(until_ms: i64) -> Error {
    Error::LockedOut {
        until: DateTime::<Utc>::from_timestamp_millis(until_ms).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60_000;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(5, Duration::minutes(15))
    }

    #[test]
    fn test_locks_on_fifth_failure() {
        let mut t = throttle();
        for _ in 0..4 {
            t.check("bob", 0).unwrap();
            t.record_failure("bob", 0).unwrap();
        }
        assert_eq!(t.failures("bob").unwrap(), 4);

        let err = t.record_failure("bob", 0).unwrap_err();
        assert!(matches!(err, Error::LockedOut { .. }));
        assert!(matches!(
            t.check("bob", 14 * MINUTE),
            Err(Error::LockedOut { .. })
        ));

        // Other identifiers are unaffected
        t.check("alice", 0).unwrap();
    }

    #[test]
    fn test_lock_expires() {
        let mut t = throttle();
        for _ in 0..5 {
            let _ = t.record_failure("bob", 0);
        }
        t.check("bob", 15 * MINUTE + 1).unwrap();
        assert_eq!(t.failures("bob").unwrap(), 0);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut t = throttle();
        t.record_failure("bob", 0).unwrap();
        t.record_failure("bob", 0).unwrap();
        t.record_success("bob").unwrap();
        assert_eq!(t.failures("bob").unwrap(), 0);
    }

    #[test]
    fn test_unbounded_lockout_saturates() {
        let mut t = LoginThrottle::new(1, Duration::max_value());
        let err = t.record_failure("bob", 1_000).unwrap_err();
        assert!(matches!(err, Error::LockedOut { .. }));
        assert!(t.check("bob", i64::MAX - 1).is_err());
    }
}
