mod cli;
mod error;

use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use figment::providers::Serialized;
use jpgx_batch::{Rotator, RunSummary, Scheduler};
use jpgx_config::{Config, Settings};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Printing only fails when stdout/stderr are gone.
            _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        },
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&args) {
        Ok(summary) => {
            tracing::info!(
                total = summary.total,
                decoded = summary.decoded,
                failed = summary.failed,
                rotated = summary.rotation.rotated,
                rotation_failed = summary.rotation.failed,
                rotation_abandoned = summary.rotation.abandoned,
                "Run complete"
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!(error = ?e, "{}", *e);
            ExitCode::FAILURE
        },
    }
}

/// Validates everything up front, then runs the batch to completion.
fn run(args: &Args) -> Result<RunSummary> {
    let (settings, rotator) = prepare(args)?;
    tracing::info!(
        raws = ?settings.raw_types,
        src_dirs = ?settings.src_dirs,
        dest_dir = %settings.dest_dir.display(),
        num_routines = settings.budget.get(),
        quality = settings.quality,
        rotate = settings.rotate,
        backend = %settings.backend,
        "Starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().or_raise(|| ErrorKind::Runtime)?;
    let decoder = settings.backend.decoder();
    let mut scheduler = Scheduler::new(Arc::new(settings), decoder);
    if let Some(rotator) = rotator {
        scheduler = scheduler.with_rotator(rotator);
    }

    let start = Instant::now();
    let summary = runtime.block_on(scheduler.run());
    let seconds = start.elapsed().as_secs_f64();
    tracing::info!("processed {} files in {:.2} minutes ({:.2} seconds)", summary.total, seconds / 60.0, seconds);
    Ok(summary)
}

/// Everything that can fail before scheduling: configuration, validation and
/// locating the rotation executable.
fn prepare(args: &Args) -> Result<(Settings, Option<Rotator>)> {
    let settings = Config::load(args.config.as_deref(), Serialized::defaults(args))
        .and_then(|config| config.validate())
        .or_raise(|| ErrorKind::Config)?;
    let rotator = if settings.rotate {
        let rotator =
            Rotator::discover(&settings.rotate_bin, settings.rotate_timeout).or_raise(|| ErrorKind::Rotator)?;
        tracing::debug!(bin = %rotator.bin().display(), "Rotation enabled");
        Some(rotator)
    } else {
        None
    };
    Ok((settings, rotator))
}
