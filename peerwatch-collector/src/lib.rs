//! peerwatch collector.
//!
//! Scans address ranges for recent peer-to-peer activity, attributes active
//! addresses to institutions, and announces (address, content) pairs that have not
//! been announced within the cooldown. Collaborators (upstream source,
//! announcement channel, callback, clock, filesystem, sleep, shutdown, logging)
//! are traits so a whole cycle runs against test doubles.

pub mod announce;
pub mod callback;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod exit;
pub mod io;
pub mod logger;
pub mod message;
pub mod signal;
pub mod sleeper;
pub mod source;

pub use announce::{AnnounceConfig, AnnounceError, Announcer, HttpAnnouncer, MockAnnouncer};
pub use callback::{
    CallbackConfig, CallbackError, CallbackNotifier, CallbackPayload, HttpCallback, MockCallback,
};
pub use cli::{parse_from, Cli, CliError};
pub use collector::{fetch_events, scan_blocks, ActivityEvent, CollectSettings, ScanResult};
pub use commands::{
    execute_run, run_cycle, wait_interruptible, CommandError, CommandResult, CyclePlan,
    CycleReport, RunResult,
};
pub use config::Config;
pub use dispatch::{CallbackStatus, DispatchOutcome, Dispatcher};
pub use logger::{Logger, MockLogger, NullLogger, TracingLogger, Verbosity};
pub use message::{compose_message, ComposedMessage, MessageSettings};
pub use signal::{AlwaysShutdown, CountingShutdown, NeverShutdown, ShutdownCheck, ShutdownFlag};
pub use sleeper::{MockSleeper, RealSleeper, Sleeper};
pub use source::{
    ActivitySource, ContentRecord, HttpActivitySource, MockActivitySource, PeerSighting,
    SourceConfig, SourceError,
};
