//! Activity collection: scan blocks for recently active addresses, then turn each
//! address's history into attributed events.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use peerwatch_ranges::{Cidr, RangeTable};

use crate::logger::Logger;
use crate::source::{ActivitySource, HistoryQuery};

/// Windows and limits for collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectSettings {
    /// An address is active if seen within this many days.
    pub recent_days: u32,
    /// How far back per-address history reaches.
    pub lookback_days: u32,
    /// Cap on content records per address.
    pub max_contents: u32,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            recent_days: 30,
            lookback_days: 30,
            max_contents: 100,
        }
    }
}

impl CollectSettings {
    pub fn history_query(&self) -> HistoryQuery {
        HistoryQuery {
            lookback_days: self.lookback_days,
            max_contents: self.max_contents,
        }
    }
}

/// One observed (address, content) sighting, ready for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub address: Ipv4Addr,
    pub content: String,
    pub occurred_at: DateTime<Tz>,
    pub institution: Option<String>,
}

/// Result of scanning every block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Distinct active addresses, ascending.
    pub addresses: BTreeSet<Ipv4Addr>,
    pub blocks_scanned: usize,
    pub blocks_failed: usize,
}

/// Query each block and collect the addresses seen strictly after `now - recent_days`.
///
/// A failed block is logged and contributes nothing.
pub fn scan_blocks<A, L>(
    source: &A,
    blocks: &[Cidr],
    table: &RangeTable,
    settings: &CollectSettings,
    now: DateTime<Utc>,
    logger: &L,
) -> ScanResult
where
    A: ActivitySource,
    L: Logger,
{
    let cutoff = now - Duration::days(i64::from(settings.recent_days));
    let mut result = ScanResult::default();

    for block in blocks {
        let label = match table.label_for_block(block) {
            Some(label) => format!("{} ({})", block, label),
            None => block.to_string(),
        };
        logger.verbose(&format!("Scanning block {}", label));
        result.blocks_scanned += 1;

        let batch = match source.peers(block) {
            Ok(batch) => batch,
            Err(e) => {
                logger.warn(&format!("Block {} query failed: {}", block, e));
                result.blocks_failed += 1;
                continue;
            }
        };
        if batch.skipped > 0 {
            logger.warn(&format!(
                "Block {}: skipped {} malformed sightings",
                block, batch.skipped
            ));
        }

        let before = result.addresses.len();
        let mut active = 0;
        for sighting in batch.items.iter().filter(|s| s.seen_at > cutoff) {
            active += 1;
            result.addresses.insert(sighting.address);
        }
        logger.verbose(&format!(
            "Block {}: {} recent sightings, {} new addresses",
            block,
            active,
            result.addresses.len() - before
        ));
    }

    result
}

/// Fetch one address's history and build its events in source order.
///
/// An unavailable history yields no events.
pub fn fetch_events<A, L>(
    source: &A,
    address: Ipv4Addr,
    table: &RangeTable,
    settings: &CollectSettings,
    zone: &Tz,
    logger: &L,
) -> Vec<ActivityEvent>
where
    A: ActivitySource,
    L: Logger,
{
    let batch = match source.history(address, &settings.history_query()) {
        Ok(batch) => batch,
        Err(e) => {
            logger.warn(&format!("History for {} unavailable: {}", address, e));
            return Vec::new();
        }
    };
    if batch.skipped > 0 {
        logger.verbose(&format!(
            "History for {}: skipped {} records without a start date",
            address, batch.skipped
        ));
    }

    let institution = table.attribute(address).map(str::to_string);
    batch
        .items
        .into_iter()
        .map(|record| ActivityEvent {
            address,
            content: record.name,
            occurred_at: record.started_at.with_timezone(zone),
            institution: institution.clone(),
        })
        .collect()
}
