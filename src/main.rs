use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use dtnsim::clock::SimulationClock;
use dtnsim::config_loader::{self, CliOverrides};
use dtnsim::control::SimRunner;
use dtnsim::report;

/// Deterministic delay-tolerant networking simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario configuration YAML file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 200)]
    ticks: u64,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write per-tick snapshots as NDJSON to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Run the scenario across this many consecutive seeds in parallel
    #[arg(long)]
    batch: Option<u32>,

    /// Output path for the batch report JSON
    #[arg(long, requires = "batch")]
    report: Option<PathBuf>,

    /// Pace ticks at the scenario's tick_interval instead of free-running
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting DTNSim");
    info!("Scenario file: {:?}", args.scenario);

    // Load and validate the scenario
    let mut config = config_loader::load_config(&args.scenario)?;
    config_loader::apply_overrides(&mut config, &CliOverrides { seed: args.seed })?;

    if let Some(runs) = args.batch {
        return run_batch(&config, runs, &args);
    }
    run_single(config, &args)
}

/// Run one simulation, optionally tracing snapshots to NDJSON.
fn run_single(config: dtnsim::config::Config, args: &Args) -> Result<()> {
    let tick_interval = if args.realtime {
        config.general.tick_interval
    } else {
        None
    };

    let mut trace = match &args.trace {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to create trace file '{}'", path.display()))?;
            info!("Writing snapshot trace to {:?}", path);
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let clock = SimulationClock::new(config)?;
    let (runner, _handle) = SimRunner::new(clock, tick_interval);

    let mut trace_error = None;
    let clock = runner.run(Some(args.ticks), |snapshot| {
        if let Some(writer) = trace.as_mut() {
            if trace_error.is_none() {
                trace_error = write_snapshot(writer, snapshot).err();
            }
        }
    });
    if let Some(err) = trace_error {
        return Err(err.wrap_err("Failed to write snapshot trace"));
    }
    if let Some(writer) = trace.as_mut() {
        writer.flush().wrap_err("Failed to flush snapshot trace")?;
    }

    let counters = clock.counters();
    info!("Simulation finished after {} tick(s)", clock.tick());
    info!(
        "Created: {} | Delivered: {} | Expired: {} | Evicted: {} | Black-hole lost: {}",
        counters.created,
        counters.delivered,
        counters.expired,
        counters.evicted,
        counters.blackhole_lost
    );
    Ok(())
}

/// Append one snapshot as a single NDJSON line.
fn write_snapshot<W: Write>(writer: &mut W, snapshot: &dtnsim::snapshot::Snapshot) -> Result<()> {
    serde_json::to_writer(&mut *writer, snapshot)?;
    writeln!(writer)?;
    Ok(())
}

/// Run the scenario across consecutive seeds and report aggregates.
fn run_batch(config: &dtnsim::config::Config, runs: u32, args: &Args) -> Result<()> {
    let batch = report::run_batch(config, config.general.seed, runs, args.ticks)?;
    info!(
        "Batch complete: mean delivery rate {:.3} (min {:.3}, max {:.3}) over {} run(s)",
        batch.mean_delivery_rate, batch.min_delivery_rate, batch.max_delivery_rate, batch.runs
    );

    match &args.report {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to create report file '{}'", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &batch)
                .wrap_err("Failed to write batch report")?;
            info!("Batch report written to {:?}", path);
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(&["dtnsim", "--scenario", "test.yaml"]);

        assert_eq!(args.scenario, PathBuf::from("test.yaml"));
        assert_eq!(args.ticks, 200);
        assert!(args.batch.is_none());
        assert!(!args.realtime);
    }

    #[test]
    fn test_batch_args() {
        let args = Args::parse_from(&[
            "dtnsim",
            "--scenario",
            "test.yaml",
            "--batch",
            "16",
            "--report",
            "report.json",
            "--seed",
            "7",
        ]);

        assert_eq!(args.batch, Some(16));
        assert_eq!(args.report, Some(PathBuf::from("report.json")));
        assert_eq!(args.seed, Some(7));
    }
}
