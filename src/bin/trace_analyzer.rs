//! Snapshot trace analysis CLI for DTNSim runs.
//!
//! Reads an NDJSON snapshot trace produced with `dtnsim --trace` and
//! summarizes delivery outcomes, buffer pressure, and contact availability.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use env_logger::Env;
use log::info;
use serde::Serialize;

use dtnsim::snapshot::Snapshot;

#[derive(Parser)]
#[command(name = "trace-analyzer")]
#[command(about = "Snapshot trace analysis for DTNSim runs")]
#[command(version)]
struct Cli {
    /// Path to the NDJSON snapshot trace
    #[arg(short, long)]
    trace: PathBuf,

    /// Emit the report as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

/// Occupancy statistics for one node across the trace.
#[derive(Debug, Serialize)]
struct NodeStats {
    peak_used: u64,
    mean_used: f64,
    attack_ticks: u64,
}

/// Availability statistics for one contact across the trace.
#[derive(Debug, Serialize)]
struct ContactStats {
    up_ticks: u64,
    uptime: f64,
}

#[derive(Debug, Serialize)]
struct TraceReport {
    ticks: u64,
    completed_at: Option<u64>,
    delivered: u64,
    expired: u64,
    evicted: u64,
    blackhole_lost: u64,
    delivery_rate: f64,
    nodes: BTreeMap<String, NodeStats>,
    contacts: BTreeMap<String, ContactStats>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Analyzing trace: {:?}", cli.trace);
    let snapshots = read_trace(&cli.trace)?;
    let report = analyze(&snapshots)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn read_trace(path: &PathBuf) -> Result<Vec<Snapshot>> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open trace file '{}'", path.display()))?;
    let mut snapshots = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let snapshot: Snapshot = serde_json::from_str(&line)
            .wrap_err_with(|| format!("Malformed snapshot on line {}", index + 1))?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

fn analyze(snapshots: &[Snapshot]) -> Result<TraceReport> {
    let last = snapshots
        .last()
        .ok_or_else(|| eyre!("trace contains no snapshots"))?;
    let ticks = snapshots.len() as u64;

    let mut nodes: BTreeMap<String, NodeStats> = BTreeMap::new();
    let mut contacts: BTreeMap<String, ContactStats> = BTreeMap::new();

    for snapshot in snapshots {
        for node in &snapshot.nodes {
            let stats = nodes.entry(node.id.clone()).or_insert(NodeStats {
                peak_used: 0,
                mean_used: 0.0,
                attack_ticks: 0,
            });
            stats.peak_used = stats.peak_used.max(node.used);
            stats.mean_used += node.used as f64;
            if node.attack.is_some() {
                stats.attack_ticks += 1;
            }
        }
        for contact in &snapshot.contacts {
            let key = format!("{}<->{}", contact.a, contact.b);
            let stats = contacts.entry(key).or_insert(ContactStats {
                up_ticks: 0,
                uptime: 0.0,
            });
            if contact.up {
                stats.up_ticks += 1;
            }
        }
    }
    for stats in nodes.values_mut() {
        stats.mean_used /= ticks as f64;
    }
    for stats in contacts.values_mut() {
        stats.uptime = stats.up_ticks as f64 / ticks as f64;
    }

    let counters = last.counters;
    let delivery_rate = if counters.created == 0 {
        0.0
    } else {
        counters.delivered as f64 / counters.created as f64
    };
    let completed_at = snapshots.iter().find(|s| s.complete).map(|s| s.tick);

    Ok(TraceReport {
        ticks,
        completed_at,
        delivered: counters.delivered,
        expired: counters.expired,
        evicted: counters.evicted,
        blackhole_lost: counters.blackhole_lost,
        delivery_rate,
        nodes,
        contacts,
    })
}

fn print_report(report: &TraceReport) {
    println!("Trace: {} tick(s)", report.ticks);
    match report.completed_at {
        Some(tick) => println!("Scenario complete at tick {}", tick),
        None => println!("Scenario incomplete at end of trace"),
    }
    println!(
        "Delivered: {} | Expired: {} | Evicted: {} | Black-hole lost: {} | Delivery rate: {:.3}",
        report.delivered,
        report.expired,
        report.evicted,
        report.blackhole_lost,
        report.delivery_rate
    );
    println!("\nNodes:");
    for (id, stats) in &report.nodes {
        println!(
            "  {:<12} peak {:>4}  mean {:>7.2}  attack ticks {}",
            id, stats.peak_used, stats.mean_used, stats.attack_ticks
        );
    }
    println!("\nContacts:");
    for (key, stats) in &report.contacts {
        println!(
            "  {:<24} up {:>5}/{} ({:.1}%)",
            key,
            stats.up_ticks,
            report.ticks,
            stats.uptime * 100.0
        );
    }
}
