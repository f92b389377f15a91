//! Notification ledger and dedup decisions for peerwatch.
//!
//! The ledger is the append-only record of every announcement made, keyed by
//! (address, content). The decision engine reads it to classify each new sighting
//! as new, suppressed by the cooldown, or a stale repeat worth announcing again.

pub mod decision;
pub mod ledger;
pub mod timefmt;

pub use decision::{classify, Cooldown, Decision, DecisionEngine};
pub use ledger::{Ledger, LedgerEntry, LedgerError, LoadStatus, LEDGER_COLUMNS};
pub use timefmt::{format_local, parse_local, resolve_local, TIMESTAMP_FORMAT};
