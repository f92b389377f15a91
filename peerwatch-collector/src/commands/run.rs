//! Run command orchestration.
//!
//! Loads the scan plan and the ledger once, then runs cycles on a fixed interval
//! until shutdown (or after one cycle with `--once`).

use peerwatch_clock::Clock;
use peerwatch_fs::Filesystem;
use peerwatch_ledger::{DecisionEngine, Ledger, LoadStatus};

use crate::announce::Announcer;
use crate::callback::CallbackNotifier;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::io::{load_scan_plan, StatusLine, StatusWriter};
use crate::logger::Logger;
use crate::signal::ShutdownCheck;
use crate::sleeper::Sleeper;
use crate::source::ActivitySource;

use super::cycle::{run_cycle, CyclePlan};
use super::CommandResult;

/// Result of run command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Number of cycles started.
    pub cycles: u64,
    /// Announcements sent across all cycles.
    pub dispatched: u64,
    /// Stopped by a shutdown request rather than `--once`.
    pub interrupted: bool,
}

/// Sleep `seconds` in one-second steps, returning early (true) on shutdown.
pub fn wait_interruptible<S, H>(sleeper: &S, shutdown: &H, seconds: u64) -> bool
where
    S: Sleeper,
    H: ShutdownCheck,
{
    for _ in 0..seconds {
        if shutdown.should_stop() {
            return true;
        }
        sleeper.sleep_sec(1);
    }
    shutdown.should_stop()
}

fn report_ledger_load<L: Logger>(status: &LoadStatus, config: &Config, logger: &L) {
    let path = config.ledger_path.display();
    match status {
        LoadStatus::Missing => logger.info(&format!("No ledger at {}, starting empty", path)),
        LoadStatus::Empty => logger.info(&format!("Ledger {} is empty", path)),
        LoadStatus::Corrupt(reason) => logger.warn(&format!(
            "Ledger {} unusable ({}), starting empty",
            path, reason
        )),
        LoadStatus::Loaded { entries, skipped } => {
            logger.info(&format!("Loaded {} ledger entries from {}", entries, path));
            if *skipped > 0 {
                logger.warn(&format!("Skipped {} malformed ledger rows", skipped));
            }
        }
    }
}

/// Execute the run command.
#[allow(clippy::too_many_arguments)]
pub fn execute_run<A, N, C, F, K, S, H, L>(
    config: &Config,
    source: &A,
    announcer: &N,
    callback: Option<&C>,
    fs: &F,
    clock: &K,
    sleeper: &S,
    shutdown: &H,
    logger: &L,
) -> CommandResult<RunResult>
where
    A: ActivitySource,
    N: Announcer,
    C: CallbackNotifier,
    F: Filesystem + Clone,
    K: Clock,
    S: Sleeper,
    H: ShutdownCheck,
    L: Logger,
{
    let scan_plan = load_scan_plan(
        fs,
        config.blocks_file.as_deref(),
        config.ranges_file.as_deref(),
        &config.expansion,
    )?;
    logger.info(&format!(
        "Scan plan: {} blocks, {} attribution ranges",
        scan_plan.blocks.len(),
        scan_plan.table.len()
    ));

    let (mut ledger, load_status) = Ledger::open(fs.clone(), config.ledger_path.clone(), config.zone);
    report_ledger_load(&load_status, config, logger);

    let status_writer = StatusWriter::new(fs.clone(), config.status_path.clone());
    let dispatcher = Dispatcher::new(
        announcer,
        callback,
        config.message.clone(),
        config.announce.permalink_base.clone(),
    );
    let plan = CyclePlan {
        blocks: &scan_plan.blocks,
        table: &scan_plan.table,
        collect: config.collect,
        engine: DecisionEngine::new(config.cooldown),
        zone: config.zone,
        dispatch_delay_sec: config.dispatch_delay_sec,
    };
    logger.verbose(&format!(
        "Cooldown {:?}, dispatch delay {}s, interval {}s",
        config.cooldown, config.dispatch_delay_sec, config.cycle_interval_sec
    ));

    let mut result = RunResult::default();

    loop {
        if shutdown.should_stop() {
            result.interrupted = true;
            break;
        }

        result.cycles += 1;
        logger.info(&format!("Starting cycle {}", result.cycles));
        let report = run_cycle(&plan, source, &dispatcher, &mut ledger, clock, sleeper, shutdown, logger);
        result.dispatched += report.dispatched as u64;

        let status = StatusLine::from_report(clock.now_unix_sec(), result.cycles, &report);
        if let Err(e) = status_writer.append(&status) {
            logger.warn(&format!("Status not written: {}", e));
        }

        if report.interrupted {
            result.interrupted = true;
            break;
        }
        if config.once {
            break;
        }

        logger.info(&format!("Waiting {}s until next cycle", config.cycle_interval_sec));
        if wait_interruptible(sleeper, shutdown, config.cycle_interval_sec) {
            result.interrupted = true;
            break;
        }
    }

    logger.info(&format!(
        "Stopped after {} cycles, {} announcements",
        result.cycles, result.dispatched
    ));
    Ok(result)
}
