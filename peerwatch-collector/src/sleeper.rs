//! Sleep abstraction so dispatch pacing and the daily wait can be tested
//! without real delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trait for sleeping between units of work.
pub trait Sleeper: Send + Sync {
    /// Sleep for the specified number of seconds.
    fn sleep_sec(&self, seconds: u64);
}

/// Real sleeper that uses `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

impl RealSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for RealSleeper {
    fn sleep_sec(&self, seconds: u64) {
        std::thread::sleep(Duration::from_secs(seconds));
    }
}

/// Mock sleeper for testing: returns immediately and records how long it was asked to sleep.
///
/// Clones share the counters.
#[derive(Debug, Default, Clone)]
pub struct MockSleeper {
    calls: Arc<AtomicU64>,
    total_sec: Arc<AtomicU64>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `sleep_sec` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total seconds requested so far.
    pub fn total_sec(&self) -> u64 {
        self.total_sec.load(Ordering::SeqCst)
    }
}

impl Sleeper for MockSleeper {
    fn sleep_sec(&self, seconds: u64) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.total_sec.fetch_add(seconds, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sleeper_returns_immediately() {
        let sleeper = MockSleeper::new();
        let start = std::time::Instant::now();
        sleeper.sleep_sec(100);
        assert!(start.elapsed().as_millis() < 10);
    }

    #[test]
    fn test_mock_sleeper_records_requests() {
        let sleeper = MockSleeper::new();
        sleeper.sleep_sec(5);
        sleeper.sleep_sec(1);
        assert_eq!(sleeper.calls(), 2);
        assert_eq!(sleeper.total_sec(), 6);
    }

    #[test]
    fn test_mock_sleeper_clone_shares_counters() {
        let sleeper = MockSleeper::new();
        sleeper.clone().sleep_sec(3);
        assert_eq!(sleeper.total_sec(), 3);
    }

    #[test]
    fn test_sleeper_trait_object() {
        let sleeper: Box<dyn Sleeper> = Box::new(MockSleeper::new());
        sleeper.sleep_sec(1);
    }

    #[test]
    fn test_real_sleeper_zero() {
        RealSleeper::new().sleep_sec(0);
    }
}
