//! Cooperative stop requests.
//!
//! `ShutdownFlag` is set by Ctrl+C. The scheduler checks it between cycles and
//! during its wait, and the cycle checks it between dispatches.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Polled between units of work; once it answers true the caller winds down.
pub trait ShutdownCheck: Send + Sync {
    fn should_stop(&self) -> bool;
}

/// Stop request shared between the Ctrl+C handler and the run loop.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    /// Flag wired to Ctrl+C. A second registration in the same process fails
    /// silently; [`ShutdownFlag::trigger`] still works.
    pub fn new() -> Self {
        let requested = Self::manual();
        let handler_side = Arc::clone(&requested.flag);
        let _ = ctrlc::set_handler(move || handler_side.store(true, Ordering::SeqCst));
        requested
    }

    /// Flag with no signal handler behind it.
    pub fn manual() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs forever.
#[derive(Debug, Default, Clone)]
pub struct NeverShutdown;

impl NeverShutdown {
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Stops at the first poll.
#[derive(Debug, Default, Clone)]
pub struct AlwaysShutdown;

impl AlwaysShutdown {
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownCheck for AlwaysShutdown {
    fn should_stop(&self) -> bool {
        true
    }
}

/// Signals shutdown once it has been polled more than `allowed` times.
///
/// Lets a test run a loop for a bounded number of checks.
#[derive(Debug, Clone)]
pub struct CountingShutdown {
    allowed: u64,
    polls: Arc<AtomicU64>,
}

impl CountingShutdown {
    pub fn new(allowed: u64) -> Self {
        Self {
            allowed,
            polls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }
}

impl ShutdownCheck for CountingShutdown {
    fn should_stop(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst) >= self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag_initially_false() {
        assert!(!ShutdownFlag::manual().should_stop());
    }

    #[test]
    fn test_shutdown_flag_trigger_and_reset() {
        let flag = ShutdownFlag::manual();
        flag.trigger();
        assert!(flag.should_stop());
        flag.reset();
        assert!(!flag.should_stop());
    }

    #[test]
    fn test_shutdown_flag_clone_shares_state() {
        let flag1 = ShutdownFlag::manual();
        let flag2 = flag1.clone();
        flag1.trigger();
        assert!(flag2.should_stop());
    }

    #[test]
    fn test_never_and_always() {
        assert!(!NeverShutdown::new().should_stop());
        assert!(AlwaysShutdown::new().should_stop());
    }

    #[test]
    fn test_counting_shutdown() {
        let check = CountingShutdown::new(2);
        assert!(!check.should_stop());
        assert!(!check.should_stop());
        assert!(check.should_stop());
        assert!(check.should_stop());
        assert_eq!(check.polls(), 4);
    }

    #[test]
    fn test_counting_shutdown_zero_stops_immediately() {
        assert!(CountingShutdown::new(0).should_stop());
    }

    #[test]
    fn test_shutdown_check_trait_object() {
        let checks: Vec<Box<dyn ShutdownCheck>> = vec![
            Box::new(ShutdownFlag::manual()),
            Box::new(NeverShutdown::new()),
            Box::new(AlwaysShutdown::new()),
        ];
        let stops: Vec<bool> = checks.iter().map(|c| c.should_stop()).collect();
        assert_eq!(stops, vec![false, false, true]);
    }
}
