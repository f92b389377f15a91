//! peerwatch binary.

use std::process::ExitCode;

use clap::Parser;
use peerwatch_clock::SystemClock;
use peerwatch_collector::exit::{codes, exit_code};
use peerwatch_collector::{
    execute_run, Cli, CommandError, HttpActivitySource, HttpAnnouncer, HttpCallback, RealSleeper,
    ShutdownFlag, TracingLogger, Verbosity,
};
use peerwatch_fs::RealFilesystem;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    // A missing .env is fine; the environment and flags still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbosity());

    match run(cli) {
        Ok(interrupted) if interrupted => ExitCode::from(codes::SIGINT as u8),
        Ok(_) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Build the real collaborators and run. Returns whether shutdown was requested.
fn run(cli: Cli) -> Result<bool, CommandError> {
    let config = cli.into_config()?;

    let shutdown = ShutdownFlag::new();
    let source = HttpActivitySource::new(config.source.clone())?;
    let announcer = HttpAnnouncer::new(config.announce.clone())?;
    let callback = config.callback.clone().map(HttpCallback::new).transpose()?;
    if callback.is_none() {
        tracing::info!("No callback configured");
    }

    let result = execute_run(
        &config,
        &source,
        &announcer,
        callback.as_ref(),
        &RealFilesystem,
        &SystemClock,
        &RealSleeper::new(),
        &shutdown,
        &TracingLogger::new(),
    )?;

    println!(
        "Ran {} cycles, sent {} announcements",
        result.cycles, result.dispatched
    );

    Ok(result.interrupted)
}
