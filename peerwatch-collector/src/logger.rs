//! Operator-facing log lines.
//!
//! Orchestration code logs through [`Logger`] so tests can assert on what a cycle
//! reported. [`TracingLogger`] forwards to `tracing` in the binary.

use std::sync::{Arc, RwLock};

/// How chatty a log line is. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// A step failed but the cycle carried on
    Warning,
    /// Progress: cycles, scans, announcements
    Normal,
    /// Per-address detail, shown with -v
    Verbose,
    /// Message bodies and suppressed pairs, shown with -vv
    Debug,
}

impl Verbosity {
    /// Level selected by repeating `-v`.
    pub fn from_count(flags: u8) -> Self {
        [Verbosity::Normal, Verbosity::Verbose]
            .get(usize::from(flags))
            .copied()
            .unwrap_or(Verbosity::Debug)
    }

    /// Default `tracing` filter directive for this level.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Warning => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Debug => "trace",
        }
    }
}

/// Sink for log lines. Helpers map onto [`Logger::log`].
pub trait Logger: Send + Sync {
    fn log(&self, level: Verbosity, message: &str);

    fn warn(&self, message: &str) {
        self.log(Verbosity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

/// Logger backed by the global `tracing` subscriber.
///
/// Filtering is left to the subscriber installed in `main`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Verbosity, message: &str) {
        match level {
            Verbosity::Warning => tracing::warn!("{}", message),
            Verbosity::Normal => tracing::info!("{}", message),
            Verbosity::Verbose => tracing::debug!("{}", message),
            Verbosity::Debug => tracing::trace!("{}", message),
        }
    }
}

/// Records every line in memory. Clones share the record.
#[derive(Debug, Clone)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

/// One recorded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

impl Default for MockLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLogger {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Text of every line, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.read().unwrap().iter().map(|entry| entry.message.clone()).collect()
    }

    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        let lines = self.messages.read().unwrap();
        lines
            .iter()
            .filter_map(|entry| (entry.level == level).then(|| entry.message.clone()))
            .collect()
    }

    /// Whether any line mentions `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.read().unwrap().iter().any(|entry| entry.message.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.write().unwrap().clear();
    }

    pub fn count(&self) -> usize {
        self.messages.read().unwrap().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl NullLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}
