//! Runtime configuration, built once from the command line and passed down.

use std::path::PathBuf;

use chrono_tz::Tz;
use peerwatch_ledger::Cooldown;
use peerwatch_ranges::ExpansionPolicy;

use crate::announce::AnnounceConfig;
use crate::callback::CallbackConfig;
use crate::collector::CollectSettings;
use crate::message::MessageSettings;
use crate::source::SourceConfig;

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceConfig,
    pub announce: AnnounceConfig,
    /// `None` disables the downstream callback.
    pub callback: Option<CallbackConfig>,
    pub ledger_path: PathBuf,
    pub status_path: PathBuf,
    pub ranges_file: Option<PathBuf>,
    pub blocks_file: Option<PathBuf>,
    pub zone: Tz,
    pub cooldown: Cooldown,
    pub expansion: ExpansionPolicy,
    pub collect: CollectSettings,
    pub message: MessageSettings,
    pub dispatch_delay_sec: u64,
    pub cycle_interval_sec: u64,
    /// Run a single cycle and exit.
    pub once: bool,
}
