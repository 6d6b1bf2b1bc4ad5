//! Twin - pairs records sharing an identifier within a time window.
//!
//! Runs a generator thread feeding a matcher thread through a blocking
//! queue for a fixed duration, then shuts both down and reports.

mod config;
mod error;
mod generator;
mod logging;
mod supervisor;

use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use clap::Parser;
use twin_metrics::format_latency;

use crate::config::{Cli, RunConfig};
use crate::generator::SequentialSource;
use crate::supervisor::Supervisor;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match RunConfig::resolve(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("twin: {err}");
            return ExitCode::from(2);
        }
    };

    // Dropped last so buffered log lines reach stdout.
    let _guard = logging::init_logging(&config.log_level);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    tracing::info!(
        run_for_secs = config.run_for_secs,
        malformed = ?config.malformed,
        matcher_core = ?config.matcher_core,
        "starting"
    );

    let source = SequentialSource::new(config.phone_prefix.clone(), config.login_stem.clone());
    let supervisor = Supervisor::start(config, source).context("starting workers")?;

    thread::sleep(config.run_for());

    let report = supervisor.shutdown().context("stopping workers")?;

    let stats = report.matcher.stats;
    tracing::info!(
        produced = report.generator.produced,
        processed = stats.processed,
        matched_full = stats.matched_full,
        matched_partial = stats.matched_partial,
        buffered = stats.buffered,
        expired = stats.expired,
        rejected = stats.rejected,
        discarded = report.matcher.discarded,
        "run complete"
    );

    let latency = &report.matcher.latency;
    latency.log_summary("matcher");
    if !latency.is_empty() {
        tracing::debug!(mean = %format_latency(latency.summary().mean as u64), "matcher mean");
    }

    Ok(())
}
