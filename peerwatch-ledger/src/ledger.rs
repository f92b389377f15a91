//! Append-only notification ledger persisted as CSV.
//!
//! File format: a header row followed by one row per announcement, with exactly the
//! columns `address,content,notified_at`. `notified_at` is wall-clock time in the
//! ledger's zone (see [`TIMESTAMP_FORMAT`](crate::TIMESTAMP_FORMAT)). Files written
//! by older deployments with the headers `ip,torrent,fecha_tweet` load as well.
//!
//! Loading never fails: a missing, empty, unreadable or schema-less file yields an
//! empty ledger and a [`LoadStatus`] describing what happened.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use peerwatch_fs::{Filesystem, FsError};
use serde::Serialize;
use thiserror::Error;

use crate::timefmt::{format_local, parse_local, resolve_local};

/// Column names written to the ledger file.
pub const LEDGER_COLUMNS: [&str; 3] = ["address", "content", "notified_at"];

/// Accepted header spellings per column, current name first.
const COLUMN_ALIASES: [[&str; 2]; 3] = [
    ["address", "ip"],
    ["content", "torrent"],
    ["notified_at", "fecha_tweet"],
];

/// Errors from ledger persistence.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to encode ledger: {0}")]
    Encode(#[from] csv::Error),

    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: FsError,
    },
}

/// One past announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub address: Ipv4Addr,
    pub content: String,
    pub notified_at: DateTime<Tz>,
}

impl LedgerEntry {
    /// Create an entry. Sub-second precision is dropped to match what is persisted.
    pub fn new(address: Ipv4Addr, content: impl Into<String>, notified_at: DateTime<Tz>) -> Self {
        Self {
            address,
            content: content.into(),
            notified_at: notified_at.with_nanosecond(0).unwrap_or(notified_at),
        }
    }

    fn matches(&self, address: Ipv4Addr, content: &str) -> bool {
        self.address == address && self.content == content
    }
}

#[derive(Serialize)]
struct LedgerRow<'a> {
    address: String,
    content: &'a str,
    notified_at: String,
}

/// Outcome of loading the ledger file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No file at the configured path.
    Missing,
    /// The file exists but holds no header row.
    Empty,
    /// The file could not be used; the ledger starts empty.
    Corrupt(String),
    /// Rows were read; `skipped` counts malformed rows that were dropped.
    Loaded { entries: usize, skipped: usize },
}

/// The notification ledger.
///
/// Entries are only ever appended. Every append is persisted before it returns.
#[derive(Debug)]
pub struct Ledger<F: Filesystem> {
    fs: F,
    path: PathBuf,
    zone: Tz,
    entries: Vec<LedgerEntry>,
}

impl<F: Filesystem> Ledger<F> {
    /// Create an empty ledger bound to `path` without touching the file.
    pub fn empty(fs: F, path: PathBuf, zone: Tz) -> Self {
        Self {
            fs,
            path,
            zone,
            entries: Vec::new(),
        }
    }

    /// Load the ledger at `path`, starting empty when the file is absent or unusable.
    pub fn open(fs: F, path: PathBuf, zone: Tz) -> (Self, LoadStatus) {
        let mut ledger = Self::empty(fs, path, zone);

        if !ledger.fs.exists(&ledger.path) {
            return (ledger, LoadStatus::Missing);
        }

        let content = match ledger.fs.read_file(&ledger.path) {
            Ok(content) => content,
            Err(e) => return (ledger, LoadStatus::Corrupt(e.to_string())),
        };

        let status = match parse_entries(&content, &zone) {
            Ok(Parsed::Empty) => LoadStatus::Empty,
            Ok(Parsed::Rows { entries, skipped }) => {
                let count = entries.len();
                ledger.entries = entries;
                LoadStatus::Loaded {
                    entries: count,
                    skipped,
                }
            }
            Err(reason) => LoadStatus::Corrupt(reason),
        };

        (ledger, status)
    }

    /// Most recent entry for (address, content).
    ///
    /// The latest `notified_at` wins; among equal timestamps the later-appended entry wins.
    pub fn latest(&self, address: Ipv4Addr, content: &str) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(address, content))
            .max_by_key(|(index, entry)| (entry.notified_at, *index))
            .map(|(_, entry)| entry)
    }

    /// Append an entry and persist the whole ledger.
    ///
    /// The entry stays in memory even if persisting fails, so later decisions in the
    /// same process still see it.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.push(entry);
        self.persist()
    }

    /// Write every entry to disk atomically.
    pub fn persist(&self) -> Result<(), LedgerError> {
        let data = encode_entries(&self.entries)?;
        self.fs
            .write_atomic(&self.path, &data)
            .map_err(|source| LedgerError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zone that `notified_at` wall-clock values are written in.
    pub fn zone(&self) -> Tz {
        self.zone
    }
}

enum Parsed {
    Empty,
    Rows {
        entries: Vec<LedgerEntry>,
        skipped: usize,
    },
}

fn parse_entries(content: &str, zone: &Tz) -> Result<Parsed, String> {
    if content.trim().is_empty() {
        return Ok(Parsed::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let mut indices = [0usize; 3];
    for (slot, aliases) in indices.iter_mut().zip(COLUMN_ALIASES.iter()) {
        *slot = headers
            .iter()
            .position(|h| aliases.contains(&h.trim()))
            .ok_or_else(|| format!("missing column {}", aliases[0]))?;
    }

    let mut entries = Vec::new();
    let mut skipped = 0;

    for record in reader.records() {
        let parsed = record.ok().and_then(|record| {
            let address = record.get(indices[0])?.trim().parse::<Ipv4Addr>().ok()?;
            let content = record.get(indices[1])?.to_string();
            let naive = parse_local(record.get(indices[2])?)?;
            Some(LedgerEntry::new(address, content, resolve_local(&naive, zone)))
        });

        match parsed {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    Ok(Parsed::Rows { entries, skipped })
}

fn encode_entries(entries: &[LedgerEntry]) -> Result<Vec<u8>, LedgerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(LEDGER_COLUMNS)?;

    for entry in entries {
        writer.serialize(LedgerRow {
            address: entry.address.to_string(),
            content: &entry.content,
            notified_at: format_local(&entry.notified_at),
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| LedgerError::Encode(csv::Error::from(e.into_error())))
}
