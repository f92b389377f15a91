//! Notification dispatch: announce, notify the callback, record in the ledger.

use chrono::{DateTime, Utc};
use peerwatch_fs::Filesystem;
use peerwatch_ledger::{format_local, Decision, Ledger, LedgerEntry};

use crate::announce::Announcer;
use crate::callback::{CallbackNotifier, CallbackPayload, DEFAULT_INSTITUTION};
use crate::collector::ActivityEvent;
use crate::logger::Logger;
use crate::message::{compose_message, permalink, MessageSettings};

/// What happened to the callback for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// No callback configured, or nothing was announced.
    Skipped,
    Delivered,
    Failed,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Reference id returned by the announcement channel.
    pub reference: Option<String>,
    pub permalink: Option<String>,
    pub callback: CallbackStatus,
    /// Whether the ledger entry reached disk.
    pub persisted: bool,
    pub truncated: bool,
}

impl DispatchOutcome {
    fn not_sent(truncated: bool) -> Self {
        Self {
            reference: None,
            permalink: None,
            callback: CallbackStatus::Skipped,
            persisted: false,
            truncated,
        }
    }

    /// Whether the public announcement went out.
    pub fn success(&self) -> bool {
        self.reference.is_some()
    }
}

/// Sends announcements and records them. The only writer of the ledger.
pub struct Dispatcher<'a, N: Announcer, C: CallbackNotifier> {
    announcer: &'a N,
    callback: Option<&'a C>,
    message: MessageSettings,
    permalink_base: String,
}

impl<'a, N: Announcer, C: CallbackNotifier> Dispatcher<'a, N, C> {
    pub fn new(
        announcer: &'a N,
        callback: Option<&'a C>,
        message: MessageSettings,
        permalink_base: impl Into<String>,
    ) -> Self {
        Self {
            announcer,
            callback,
            message,
            permalink_base: permalink_base.into(),
        }
    }

    /// Dispatch `event` under `decision`, appending to `ledger` on success.
    ///
    /// Suppressed events are not sent. A failed announcement leaves the ledger
    /// untouched so the event is retried next cycle. Callback and persistence
    /// failures are logged and do not undo the announcement.
    pub fn dispatch<F, L>(
        &self,
        event: &ActivityEvent,
        decision: Decision,
        ledger: &mut Ledger<F>,
        now: DateTime<Utc>,
        logger: &L,
    ) -> DispatchOutcome
    where
        F: Filesystem,
        L: Logger,
    {
        if !decision.should_notify() {
            logger.debug(&format!(
                "Not dispatching suppressed {} / {}",
                event.address, event.content
            ));
            return DispatchOutcome::not_sent(false);
        }

        let message = compose_message(event, decision.is_repeat(), &self.message);
        if message.truncated {
            logger.verbose(&format!(
                "Message for {} over {} characters, content name truncated",
                event.address, self.message.max_chars
            ));
        }
        if !message.within_limit {
            logger.warn(&format!(
                "Message for {} still exceeds {} characters, sending as is",
                event.address, self.message.max_chars
            ));
        }
        logger.debug(&format!("Announcing:\n{}", message.text));

        let reference = match self.announcer.announce(&message.text) {
            Ok(reference) => reference,
            Err(e) if e.is_unconfirmed() => {
                // not recorded, so the next cycle may post it a second time
                logger.warn(&format!(
                    "Announcement for {} / {} may already be public but was not recorded: {}",
                    event.address, event.content, e
                ));
                return DispatchOutcome::not_sent(message.truncated);
            }
            Err(e) => {
                logger.warn(&format!(
                    "Announcement for {} / {} failed: {}",
                    event.address, event.content, e
                ));
                return DispatchOutcome::not_sent(message.truncated);
            }
        };
        let link = permalink(&self.permalink_base, &reference);
        logger.info(&format!("Announced {} ({}): {}", event.address, decision.as_str(), link));

        let callback = self.notify_callback(event, &link, logger);

        let entry = LedgerEntry::new(
            event.address,
            event.content.clone(),
            now.with_timezone(&ledger.zone()),
        );
        let persisted = match ledger.append(entry) {
            Ok(()) => true,
            Err(e) => {
                logger.warn(&format!("Ledger not persisted: {}", e));
                false
            }
        };

        DispatchOutcome {
            reference: Some(reference),
            permalink: Some(link),
            callback,
            persisted,
            truncated: message.truncated,
        }
    }

    fn notify_callback<L: Logger>(&self, event: &ActivityEvent, link: &str, logger: &L) -> CallbackStatus {
        let Some(callback) = self.callback else {
            return CallbackStatus::Skipped;
        };

        let payload = CallbackPayload {
            ip: event.address.to_string(),
            torrent: event.content.clone(),
            fecha_hora: format_local(&event.occurred_at),
            institucion: event
                .institution
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTITUTION.to_string()),
            enlace: self.message.activity_link(event.address),
            enlace_tweet: link.to_string(),
        };

        match callback.notify(&payload) {
            Ok(()) => {
                logger.verbose(&format!("Callback delivered for {}", event.address));
                CallbackStatus::Delivered
            }
            Err(e) => {
                logger.warn(&format!("Callback for {} failed: {}", event.address, e));
                CallbackStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::MockAnnouncer;
    use crate::callback::MockCallback;
    use crate::logger::{MockLogger, Verbosity};
    use crate::message::REPEAT_QUALIFIER;
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::Santiago;
    use peerwatch_fs::MockFilesystem;
    use std::path::{Path, PathBuf};

    const LEDGER: &str = "/var/lib/peerwatch/ledger.csv";
    const PERMALINK_BASE: &str = "https://twitter.com/EstadoDescarga/status";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
    }

    fn event(institution: Option<&str>) -> ActivityEvent {
        ActivityEvent {
            address: "163.247.45.10".parse().unwrap(),
            content: "ExampleFile".to_string(),
            occurred_at: (t0() - Duration::days(2)).with_timezone(&Santiago),
            institution: institution.map(str::to_string),
        }
    }

    fn ledger(fs: &MockFilesystem) -> Ledger<MockFilesystem> {
        Ledger::empty(fs.clone(), PathBuf::from(LEDGER), Santiago)
    }

    // ===========================================
    // Test Category C: Dispatch outcomes
    // ===========================================

    #[test]
    fn test_dispatch_new_records_and_persists() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let callback = MockCallback::new();
        let dispatcher = Dispatcher::new(&announcer, Some(&callback), MessageSettings::default(), PERMALINK_BASE);

        let outcome = dispatcher.dispatch(&event(Some("@Min_Hacienda")), Decision::New, &mut ledger, t0(), &MockLogger::new());

        assert!(outcome.success());
        assert_eq!(outcome.permalink.as_deref(), Some("https://twitter.com/EstadoDescarga/status/1001"));
        assert_eq!(outcome.callback, CallbackStatus::Delivered);
        assert!(outcome.persisted);
        assert_eq!(ledger.len(), 1);
        assert_eq!(format_local(&ledger.entries()[0].notified_at), "2024-01-15 12:00:00");
        assert!(fs.get_text(Path::new(LEDGER)).unwrap().contains("163.247.45.10,ExampleFile"));
    }

    #[test]
    fn test_dispatch_callback_payload() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let callback = MockCallback::new();
        let dispatcher = Dispatcher::new(&announcer, Some(&callback), MessageSettings::default(), PERMALINK_BASE);

        dispatcher.dispatch(&event(None), Decision::New, &mut ledger, t0(), &MockLogger::new());

        let delivered = callback.delivered();
        assert_eq!(delivered.len(), 1);
        let payload = &delivered[0];
        assert_eq!(payload.ip, "163.247.45.10");
        assert_eq!(payload.torrent, "ExampleFile");
        assert_eq!(payload.fecha_hora, "2024-01-13 12:00:00");
        assert_eq!(payload.institucion, "Estatal");
        assert_eq!(payload.enlace, "https://iknowwhatyoudownload.com/en/peer/?ip=163.247.45.10");
        assert_eq!(payload.enlace_tweet, "https://twitter.com/EstadoDescarga/status/1001");
    }

    #[test]
    fn test_dispatch_stale_repeat_carries_qualifier() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let dispatcher: Dispatcher<'_, _, MockCallback> =
            Dispatcher::new(&announcer, None, MessageSettings::default(), PERMALINK_BASE);

        let outcome = dispatcher.dispatch(&event(None), Decision::StaleRepeat, &mut ledger, t0(), &MockLogger::new());

        assert!(outcome.success());
        assert_eq!(outcome.callback, CallbackStatus::Skipped);
        assert!(announcer.published()[0].contains(REPEAT_QUALIFIER));
    }

    #[test]
    fn test_dispatch_suppressed_sends_nothing() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let dispatcher: Dispatcher<'_, _, MockCallback> =
            Dispatcher::new(&announcer, None, MessageSettings::default(), PERMALINK_BASE);

        let outcome = dispatcher.dispatch(&event(None), Decision::Suppressed, &mut ledger, t0(), &MockLogger::new());

        assert!(!outcome.success());
        assert_eq!(announcer.count(), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_dispatch_announce_failure_leaves_ledger_untouched() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        announcer.fail_all(true);
        let callback = MockCallback::new();
        let dispatcher = Dispatcher::new(&announcer, Some(&callback), MessageSettings::default(), PERMALINK_BASE);
        let logger = MockLogger::new();

        let outcome = dispatcher.dispatch(&event(None), Decision::New, &mut ledger, t0(), &logger);

        assert!(!outcome.success());
        assert!(ledger.is_empty());
        assert!(callback.delivered().is_empty());
        assert!(!fs.exists(Path::new(LEDGER)));
        assert!(logger.contains("failed"));
    }

    #[test]
    fn test_dispatch_unconfirmed_announcement_is_logged_distinctly() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        announcer.unconfirm_next(1);
        let callback = MockCallback::new();
        let dispatcher = Dispatcher::new(&announcer, Some(&callback), MessageSettings::default(), PERMALINK_BASE);
        let logger = MockLogger::new();

        let outcome = dispatcher.dispatch(&event(None), Decision::New, &mut ledger, t0(), &logger);

        assert!(!outcome.success());
        assert!(ledger.is_empty());
        assert!(callback.delivered().is_empty());
        assert_eq!(announcer.count(), 1);
        let warnings = logger.messages_at_level(Verbosity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("163.247.45.10 / ExampleFile may already be public"));
        assert!(warnings[0].contains("status 201"));
    }

    #[test]
    fn test_dispatch_callback_failure_is_swallowed() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let callback = MockCallback::new();
        callback.fail(true);
        let dispatcher = Dispatcher::new(&announcer, Some(&callback), MessageSettings::default(), PERMALINK_BASE);

        let outcome = dispatcher.dispatch(&event(None), Decision::New, &mut ledger, t0(), &MockLogger::new());

        assert!(outcome.success());
        assert_eq!(outcome.callback, CallbackStatus::Failed);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_dispatch_persist_failure_keeps_memory_entry() {
        let fs = MockFilesystem::new();
        fs.fail_writes(true);
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let dispatcher: Dispatcher<'_, _, MockCallback> =
            Dispatcher::new(&announcer, None, MessageSettings::default(), PERMALINK_BASE);
        let logger = MockLogger::new();

        let outcome = dispatcher.dispatch(&event(None), Decision::New, &mut ledger, t0(), &logger);

        assert!(outcome.success());
        assert!(!outcome.persisted);
        assert_eq!(ledger.len(), 1);
        assert!(logger.contains("Ledger not persisted"));
    }

    #[test]
    fn test_dispatch_truncated_message() {
        let fs = MockFilesystem::new();
        let mut ledger = ledger(&fs);
        let announcer = MockAnnouncer::new();
        let dispatcher: Dispatcher<'_, _, MockCallback> =
            Dispatcher::new(&announcer, None, MessageSettings::default(), PERMALINK_BASE);
        let mut long = event(None);
        long.content = "z".repeat(300);

        let outcome = dispatcher.dispatch(&long, Decision::New, &mut ledger, t0(), &MockLogger::new());

        assert!(outcome.truncated);
        assert!(announcer.published()[0].chars().count() <= 280);
        // the ledger keeps the full name so later decisions match
        assert_eq!(ledger.entries()[0].content.len(), 300);
    }
}
