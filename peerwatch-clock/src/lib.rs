//! Time source for peerwatch.
//!
//! Cooldown decisions and ledger timestamps read the time through [`Clock`], so
//! tests can pin it to a known instant or step it forward across a cooldown.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Whole seconds since the Unix epoch.
    fn now_unix_sec(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the instant.
#[derive(Debug, Clone)]
pub struct MockClock {
    instant: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(RwLock::new(instant)),
        }
    }

    /// Clock at `secs` past the epoch. Out-of-range values land on the epoch.
    pub fn from_unix(secs: i64) -> Self {
        Self::new(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.instant.write().unwrap() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut instant = self.instant.write().unwrap();
        *instant += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.read().unwrap()
    }
}
