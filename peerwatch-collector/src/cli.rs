//! CLI argument parsing for peerwatch.
//!
//! Every flag has an environment variable so the service can be configured from a
//! `.env` file or the unit environment. Credentials are only taken from flags or
//! the environment, never from files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use clap::{ArgAction, Parser};
use peerwatch_ledger::Cooldown;
use peerwatch_ranges::ExpansionPolicy;
use thiserror::Error;

use crate::announce::AnnounceConfig;
use crate::callback::CallbackConfig;
use crate::collector::CollectSettings;
use crate::config::Config;
use crate::logger::Verbosity;
use crate::message::{MessageSettings, DEFAULT_ACTIVITY_LINK_BASE};
use crate::source::SourceConfig;

pub const DEFAULT_SOURCE_URL: &str = "https://api.antitor.com";
pub const DEFAULT_ANNOUNCE_URL: &str = "https://api.twitter.com/2/tweets";
pub const DEFAULT_PERMALINK_BASE: &str = "https://twitter.com/EstadoDescarga/status";
pub const DEFAULT_LEDGER_PATH: &str = "historial.csv";
pub const DEFAULT_TIMEZONE: &str = "America/Santiago";
pub const DEFAULT_COOLDOWN_MONTHS: u32 = 2;
pub const DEFAULT_CYCLE_INTERVAL_SEC: u64 = 86_400;
pub const DEFAULT_DISPATCH_DELAY_SEC: u64 = 5;
pub const DEFAULT_SOURCE_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_ANNOUNCE_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_CALLBACK_TIMEOUT_SEC: u64 = 5;

/// Name of the heartbeat file written next to the ledger by default.
pub const STATUS_FILE_NAME: &str = "status.jsonl";

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("{name} must be at least 1, got {value}")]
    MustBePositive { name: &'static str, value: u64 },

    #[error("content-max-chars ({content}) must leave room within max-message-chars ({message})")]
    ContentLimitTooLarge { content: usize, message: usize },

    #[error("callback-url is set but callback-key is missing")]
    MissingCallbackKey,
}

/// Watch address ranges for file-sharing activity and announce new sightings.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "peerwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the peer-history API.
    #[arg(long, env = "PEERWATCH_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    /// API key for the peer-history API.
    #[arg(long, env = "PEERWATCH_SOURCE_KEY", hide_env_values = true)]
    pub source_key: String,

    /// Per-request timeout for the peer-history API.
    #[arg(long, env = "PEERWATCH_SOURCE_TIMEOUT_SEC", default_value_t = DEFAULT_SOURCE_TIMEOUT_SEC)]
    pub source_timeout_sec: u64,

    /// Announcement endpoint.
    #[arg(long, env = "PEERWATCH_ANNOUNCE_URL", default_value = DEFAULT_ANNOUNCE_URL)]
    pub announce_url: String,

    /// Bearer token for the announcement endpoint.
    #[arg(long, env = "PEERWATCH_ANNOUNCE_TOKEN", hide_env_values = true)]
    pub announce_token: String,

    /// Per-request timeout for the announcement endpoint.
    #[arg(long, env = "PEERWATCH_ANNOUNCE_TIMEOUT_SEC", default_value_t = DEFAULT_ANNOUNCE_TIMEOUT_SEC)]
    pub announce_timeout_sec: u64,

    /// Base of public announcement links.
    #[arg(long, env = "PEERWATCH_PERMALINK_BASE", default_value = DEFAULT_PERMALINK_BASE)]
    pub permalink_base: String,

    /// Prefix of the per-address activity link; the address is appended.
    #[arg(long, env = "PEERWATCH_ACTIVITY_LINK_BASE", default_value = DEFAULT_ACTIVITY_LINK_BASE)]
    pub activity_link_base: String,

    /// Webhook notified after each announcement. Disabled when unset.
    #[arg(long, env = "PEERWATCH_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Value of the X-API-KEY header sent to the webhook.
    #[arg(long, env = "PEERWATCH_CALLBACK_KEY", hide_env_values = true)]
    pub callback_key: Option<String>,

    #[arg(long, env = "PEERWATCH_CALLBACK_TIMEOUT_SEC", default_value_t = DEFAULT_CALLBACK_TIMEOUT_SEC)]
    pub callback_timeout_sec: u64,

    /// Notification ledger (CSV).
    #[arg(long, env = "PEERWATCH_LEDGER", default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: PathBuf,

    /// Status heartbeat file. Defaults to status.jsonl next to the ledger.
    #[arg(long, env = "PEERWATCH_STATUS_FILE")]
    pub status_file: Option<PathBuf>,

    /// Range table file (`CIDR [label]` per line). Uses the built-in table when unset.
    #[arg(long, env = "PEERWATCH_RANGES_FILE")]
    pub ranges_file: Option<PathBuf>,

    /// Scan blocks file (one CIDR per line). Uses the built-in blocks when unset.
    #[arg(long, env = "PEERWATCH_BLOCKS_FILE")]
    pub blocks_file: Option<PathBuf>,

    /// IANA time zone for ledger and message timestamps.
    #[arg(long, env = "PEERWATCH_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Cooldown in calendar months.
    #[arg(long, env = "PEERWATCH_COOLDOWN_MONTHS", conflicts_with = "cooldown_days")]
    pub cooldown_months: Option<u32>,

    /// Cooldown as a fixed number of days.
    #[arg(long, env = "PEERWATCH_COOLDOWN_DAYS")]
    pub cooldown_days: Option<u32>,

    /// An address counts as active if seen within this many days.
    #[arg(long, env = "PEERWATCH_RECENT_DAYS", default_value_t = 30)]
    pub recent_days: u32,

    /// Days of per-address history to request.
    #[arg(long, env = "PEERWATCH_LOOKBACK_DAYS", default_value_t = 30)]
    pub lookback_days: u32,

    /// Maximum content records per address.
    #[arg(long, env = "PEERWATCH_MAX_CONTENTS", default_value_t = 100)]
    pub max_contents: u32,

    #[arg(long, env = "PEERWATCH_MAX_MESSAGE_CHARS", default_value_t = 280)]
    pub max_message_chars: usize,

    /// Length content names are cut to when a message is too long.
    #[arg(long, env = "PEERWATCH_CONTENT_MAX_CHARS", default_value_t = 100)]
    pub content_max_chars: usize,

    /// Pause after each dispatch attempt.
    #[arg(long, env = "PEERWATCH_DISPATCH_DELAY_SEC", default_value_t = DEFAULT_DISPATCH_DELAY_SEC)]
    pub dispatch_delay_sec: u64,

    /// Wait between cycles.
    #[arg(long, env = "PEERWATCH_INTERVAL_SEC", default_value_t = DEFAULT_CYCLE_INTERVAL_SEC)]
    pub interval_sec: u64,

    /// Run one cycle and exit.
    #[arg(long, env = "PEERWATCH_ONCE")]
    pub once: bool,

    /// Increase log output (-v, -vv). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        self.zone()?;

        let positive: [(&'static str, u64); 9] = [
            ("source-timeout-sec", self.source_timeout_sec),
            ("announce-timeout-sec", self.announce_timeout_sec),
            ("callback-timeout-sec", self.callback_timeout_sec),
            ("recent-days", u64::from(self.recent_days)),
            ("lookback-days", u64::from(self.lookback_days)),
            ("max-contents", u64::from(self.max_contents)),
            ("max-message-chars", self.max_message_chars as u64),
            ("content-max-chars", self.content_max_chars as u64),
            ("interval-sec", self.interval_sec),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CliError::MustBePositive { name, value });
            }
        }

        if let Some(months) = self.cooldown_months.filter(|m| *m == 0) {
            return Err(CliError::MustBePositive {
                name: "cooldown-months",
                value: u64::from(months),
            });
        }
        if let Some(days) = self.cooldown_days.filter(|d| *d == 0) {
            return Err(CliError::MustBePositive {
                name: "cooldown-days",
                value: u64::from(days),
            });
        }

        if self.content_max_chars >= self.max_message_chars {
            return Err(CliError::ContentLimitTooLarge {
                content: self.content_max_chars,
                message: self.max_message_chars,
            });
        }

        if self.callback_url.is_some() && self.callback_key.is_none() {
            return Err(CliError::MissingCallbackKey);
        }

        Ok(())
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_count(self.verbose)
    }

    fn zone(&self) -> Result<Tz, CliError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| CliError::UnknownTimezone(self.timezone.clone()))
    }

    fn cooldown(&self) -> Cooldown {
        match (self.cooldown_days, self.cooldown_months) {
            (Some(days), _) => Cooldown::Span(chrono::Duration::days(i64::from(days))),
            (None, Some(months)) => Cooldown::Months(months),
            (None, None) => Cooldown::Months(DEFAULT_COOLDOWN_MONTHS),
        }
    }

    fn status_path(&self) -> PathBuf {
        match &self.status_file {
            Some(path) => path.clone(),
            None => self
                .ledger
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(STATUS_FILE_NAME),
        }
    }

    /// Validate and build the runtime configuration.
    pub fn into_config(self) -> Result<Config, CliError> {
        self.validate()?;

        let zone = self.zone()?;
        let cooldown = self.cooldown();
        let status_path = self.status_path();

        let callback = match (self.callback_url, self.callback_key) {
            (Some(url), Some(api_key)) => Some(CallbackConfig {
                url,
                api_key,
                timeout: Duration::from_secs(self.callback_timeout_sec),
            }),
            _ => None,
        };

        Ok(Config {
            source: SourceConfig {
                base_url: self.source_url,
                api_key: self.source_key,
                timeout: Duration::from_secs(self.source_timeout_sec),
            },
            announce: AnnounceConfig {
                url: self.announce_url,
                token: self.announce_token,
                permalink_base: self.permalink_base,
                timeout: Duration::from_secs(self.announce_timeout_sec),
            },
            callback,
            ledger_path: self.ledger,
            status_path,
            ranges_file: self.ranges_file,
            blocks_file: self.blocks_file,
            zone,
            cooldown,
            expansion: ExpansionPolicy::default(),
            collect: CollectSettings {
                recent_days: self.recent_days,
                lookback_days: self.lookback_days,
                max_contents: self.max_contents,
            },
            message: MessageSettings {
                max_chars: self.max_message_chars,
                content_max_chars: self.content_max_chars,
                activity_link_base: self.activity_link_base,
            },
            dispatch_delay_sec: self.dispatch_delay_sec,
            cycle_interval_sec: self.interval_sec,
            once: self.once,
        })
    }
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
