//! Run summaries and batch analysis.
//!
//! A single run produces a `RunSummary` from its final counters. Batch mode
//! replays one scenario across a range of seeds in parallel and aggregates
//! delivery statistics into a timestamped report, for measuring how much an
//! attack or an unreliable contact degrades delivery on average.

use chrono::{DateTime, Utc};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::config::{Config, ValidationError};
use crate::snapshot::Counters;

/// Final statistics of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: u64,
    pub counters: Counters,
    /// Delivered as a fraction of created; 0 when nothing was created.
    pub delivery_rate: f64,
    pub complete: bool,
}

impl RunSummary {
    fn from_clock(clock: &SimulationClock, seed: u64, ticks: u64, complete: bool) -> Self {
        let counters = clock.counters();
        let delivery_rate = if counters.created == 0 {
            0.0
        } else {
            counters.delivered as f64 / counters.created as f64
        };
        Self {
            seed,
            ticks,
            counters,
            delivery_rate,
            complete,
        }
    }
}

/// Aggregated results of a multi-seed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub base_seed: u64,
    pub runs: u32,
    pub ticks: u64,
    pub mean_delivery_rate: f64,
    pub min_delivery_rate: f64,
    pub max_delivery_rate: f64,
    pub totals: Counters,
    pub summaries: Vec<RunSummary>,
}

/// Run a scenario to completion of the given tick budget.
pub fn run_once(config: &Config, ticks: u64) -> Result<RunSummary, ValidationError> {
    let seed = config.general.seed;
    let mut clock = SimulationClock::new(config.clone())?;
    let mut complete = false;
    for _ in 0..ticks {
        complete = clock.step().complete;
    }
    Ok(RunSummary::from_clock(&clock, seed, ticks, complete))
}

/// Run the scenario across `runs` consecutive seeds in parallel.
///
/// Each run is an independent simulation with its own generator, so per-seed
/// determinism is preserved; only the seed varies between runs.
pub fn run_batch(
    config: &Config,
    base_seed: u64,
    runs: u32,
    ticks: u64,
) -> Result<BatchReport, ValidationError> {
    // Validate once up front so a malformed scenario fails before any
    // worker starts.
    config.validate()?;
    info!(
        "batch: {} run(s) of {} tick(s) from seed {}",
        runs, ticks, base_seed
    );

    let summaries: Vec<RunSummary> = (0..runs as u64)
        .into_par_iter()
        .map(|offset| {
            let mut per_run = config.clone();
            per_run.general.seed = base_seed.wrapping_add(offset);
            run_once(&per_run, ticks)
        })
        .collect::<Result<_, _>>()?;

    let mut totals = Counters::default();
    for summary in &summaries {
        totals.created += summary.counters.created;
        totals.delivered += summary.counters.delivered;
        totals.forwarded += summary.counters.forwarded;
        totals.expired += summary.counters.expired;
        totals.evicted += summary.counters.evicted;
        totals.blackhole_lost += summary.counters.blackhole_lost;
    }
    let rates: Vec<f64> = summaries.iter().map(|s| s.delivery_rate).collect();
    let (mean, min, max) = if rates.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            rates.iter().sum::<f64>() / rates.len() as f64,
            rates.iter().copied().fold(f64::INFINITY, f64::min),
            rates.iter().copied().fold(0.0, f64::max),
        )
    };

    Ok(BatchReport {
        generated_at: Utc::now(),
        base_seed,
        runs,
        ticks,
        mean_delivery_rate: mean,
        min_delivery_rate: min,
        max_delivery_rate: max,
        totals,
        summaries,
    })
}
