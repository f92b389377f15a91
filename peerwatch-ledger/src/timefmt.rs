//! Local wall-clock timestamps.
//!
//! The ledger and the announcement text both carry second-precision wall-clock
//! times in a single configured zone, without an offset.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Wall-clock format used in the ledger and in messages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render an instant as wall-clock time in its own zone.
pub fn format_local(at: &DateTime<Tz>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wall-clock string. Fractional seconds are accepted and kept.
pub fn parse_local(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Pin a wall-clock time to an instant in `zone`.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant. Times that
/// fall in a gap (clocks going forward) move forward by one hour.
pub fn resolve_local(naive: &NaiveDateTime, zone: &Tz) -> DateTime<Tz> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => zone
            .from_local_datetime(&(*naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| zone.from_utc_datetime(naive)),
    }
}
