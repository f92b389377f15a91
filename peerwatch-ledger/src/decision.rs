//! Cooldown rule and notification decisions.

use std::net::Ipv4Addr;

use chrono::{DateTime, Duration, Months, Utc};
use chrono_tz::Tz;
use peerwatch_fs::Filesystem;

use crate::ledger::Ledger;
use crate::timefmt::resolve_local;

/// How long after an announcement the same (address, content) pair stays quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    /// Calendar months, subtracted from the wall-clock "now" with day clamping
    /// (Mar 31 - 1 month = Feb 29), then pinned in the zone like any other local time.
    Months(u32),
    /// Fixed elapsed duration.
    Span(Duration),
}

impl Default for Cooldown {
    fn default() -> Self {
        Cooldown::Months(2)
    }
}

impl Cooldown {
    /// Whether the cooldown that started at `since` is over at `now`.
    ///
    /// An age exactly equal to the cooldown counts as elapsed.
    pub fn has_elapsed(&self, since: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
        match self {
            Cooldown::Months(n) => {
                // 30-day months only when the calendar result is out of range
                let cutoff = now
                    .naive_local()
                    .checked_sub_months(Months::new(*n))
                    .map(|naive| resolve_local(&naive, &now.timezone()))
                    .unwrap_or_else(|| *now - Duration::days(30 * i64::from(*n)));
                *since <= cutoff
            }
            Cooldown::Span(span) => *now - *since >= *span,
        }
    }
}

/// What to do with a candidate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Never announced.
    New,
    /// Announced within the cooldown.
    Suppressed,
    /// Announced before, but the cooldown has passed.
    StaleRepeat,
}

impl Decision {
    pub fn should_notify(&self) -> bool {
        !matches!(self, Decision::Suppressed)
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Decision::StaleRepeat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::New => "new",
            Decision::Suppressed => "suppressed",
            Decision::StaleRepeat => "stale_repeat",
        }
    }
}

/// Classify a candidate given the time of its most recent announcement.
pub fn classify(previous: Option<&DateTime<Tz>>, now: &DateTime<Tz>, cooldown: &Cooldown) -> Decision {
    match previous {
        None => Decision::New,
        Some(since) if cooldown.has_elapsed(since, now) => Decision::StaleRepeat,
        Some(_) => Decision::Suppressed,
    }
}

/// Reads the ledger and applies the cooldown rule. Never writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    cooldown: Cooldown,
}

impl DecisionEngine {
    pub fn new(cooldown: Cooldown) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Cooldown {
        self.cooldown
    }

    /// Decide for (address, content) at `now`, compared in the ledger's zone.
    pub fn decide<F: Filesystem>(
        &self,
        ledger: &Ledger<F>,
        address: Ipv4Addr,
        content: &str,
        now: DateTime<Utc>,
    ) -> Decision {
        let now = now.with_timezone(&ledger.zone());
        let previous = ledger.latest(address, content).map(|entry| &entry.notified_at);
        classify(previous, &now, &self.cooldown)
    }
}
