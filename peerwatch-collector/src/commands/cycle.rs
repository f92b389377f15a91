//! One monitoring cycle.
//!
//! Scan every block, fetch each active address's history, decide per event and
//! dispatch the ones worth announcing. Nothing in here aborts the cycle: failures
//! are logged, counted and skipped.

use chrono_tz::Tz;
use peerwatch_clock::Clock;
use peerwatch_fs::Filesystem;
use peerwatch_ledger::{Decision, DecisionEngine, Ledger};
use peerwatch_ranges::{Cidr, RangeTable};

use crate::announce::Announcer;
use crate::callback::CallbackNotifier;
use crate::collector::{fetch_events, scan_blocks, CollectSettings};
use crate::dispatch::Dispatcher;
use crate::logger::Logger;
use crate::signal::ShutdownCheck;
use crate::sleeper::Sleeper;
use crate::source::ActivitySource;

/// Fixed inputs of a cycle.
#[derive(Debug, Clone)]
pub struct CyclePlan<'a> {
    /// Expanded scan blocks.
    pub blocks: &'a [Cidr],
    pub table: &'a RangeTable,
    pub collect: CollectSettings,
    pub engine: DecisionEngine,
    pub zone: Tz,
    pub dispatch_delay_sec: u64,
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub blocks_scanned: usize,
    pub blocks_failed: usize,
    pub active_addresses: usize,
    pub events: usize,
    /// Announcements that went out.
    pub dispatched: usize,
    pub suppressed: usize,
    /// Events decided as stale repeats (dispatched or not).
    pub stale_repeats: usize,
    /// Announcements that failed, plus ledger writes that failed after one succeeded.
    pub failures: usize,
    /// Shutdown was requested before the cycle finished.
    pub interrupted: bool,
}

/// Run one cycle against `ledger`.
///
/// Shutdown is honoured between addresses and between dispatches, never between an
/// announcement and its ledger append.
#[allow(clippy::too_many_arguments)]
pub fn run_cycle<A, N, C, F, K, S, H, L>(
    plan: &CyclePlan<'_>,
    source: &A,
    dispatcher: &Dispatcher<'_, N, C>,
    ledger: &mut Ledger<F>,
    clock: &K,
    sleeper: &S,
    shutdown: &H,
    logger: &L,
) -> CycleReport
where
    A: ActivitySource,
    N: Announcer,
    C: CallbackNotifier,
    F: Filesystem,
    K: Clock,
    S: Sleeper,
    H: ShutdownCheck,
    L: Logger,
{
    let mut report = CycleReport::default();

    let scan = scan_blocks(source, plan.blocks, plan.table, &plan.collect, clock.now(), logger);
    report.blocks_scanned = scan.blocks_scanned;
    report.blocks_failed = scan.blocks_failed;
    report.active_addresses = scan.addresses.len();
    logger.info(&format!(
        "Scanned {} blocks ({} failed), {} active addresses",
        scan.blocks_scanned,
        scan.blocks_failed,
        scan.addresses.len()
    ));

    'addresses: for address in scan.addresses {
        if shutdown.should_stop() {
            report.interrupted = true;
            break;
        }

        let events = fetch_events(source, address, plan.table, &plan.collect, &plan.zone, logger);
        logger.verbose(&format!("{}: {} events", address, events.len()));
        report.events += events.len();

        for event in &events {
            let decision = plan
                .engine
                .decide(ledger, event.address, &event.content, clock.now());

            match decision {
                Decision::Suppressed => {
                    report.suppressed += 1;
                    logger.debug(&format!("Suppressed {} / {}", event.address, event.content));
                    continue;
                }
                Decision::StaleRepeat => report.stale_repeats += 1,
                Decision::New => {}
            }

            if shutdown.should_stop() {
                report.interrupted = true;
                break 'addresses;
            }

            let outcome = dispatcher.dispatch(event, decision, ledger, clock.now(), logger);
            if outcome.success() {
                report.dispatched += 1;
                if !outcome.persisted {
                    report.failures += 1;
                }
            } else {
                report.failures += 1;
            }

            sleeper.sleep_sec(plan.dispatch_delay_sec);
        }
    }

    if report.events == 0 && !report.interrupted {
        logger.info("No recent activity found");
    }
    logger.info(&format!(
        "Cycle done: {} events, {} dispatched, {} suppressed, {} stale repeats, {} failures",
        report.events, report.dispatched, report.suppressed, report.stale_repeats, report.failures
    ));

    report
}
