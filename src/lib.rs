//! # DTNSim - Deterministic delay-tolerant networking simulator
//!
//! This library provides the simulation core for store-and-forward bundle
//! delivery across a time-varying contact graph with injectable adversarial
//! behaviors (black hole, resource exhaustion, jamming, forced outage).
//!
//! ## Overview
//!
//! DTNSim enables controlled, reproducible experiments on disruption-tolerant
//! routing without deploying real infrastructure. A YAML scenario describes
//! the node graph, contact rules, routing table, traffic, and attack
//! schedule; the core advances the network one tick at a time and publishes
//! an immutable snapshot per tick for presentation layers and analysis.
//!
//! ## Key Features
//!
//! - **Discrete-tick core**: contact resolution, attack overlay, forwarding,
//!   and TTL expiry run in a fixed order each tick
//! - **Custody-based forwarding**: bundles move buffer to buffer with an
//!   auditable custody path; forwarded copies are deleted unconditionally
//! - **Attack injection**: black hole, resource exhaustion, jamming, and
//!   outage as small activation state machines with exact reversion
//! - **Reproducible**: opportunistic contacts roll from a seeded generator,
//!   so identical scenarios and seeds produce identical runs
//! - **Batch analysis**: parallel multi-seed runs with aggregated delivery
//!   statistics
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Type-safe scenario structures and validation
//! - `config_loader`: Scenario file loading and CLI overrides
//! - `bundle`: The bundle data entity
//! - `buffer`: Bounded per-node storage with admission and eviction
//! - `topology`: Nodes, contacts, eligibility windows, per-tick resolution
//! - `attack`: Adversarial behavior state machines
//! - `routing`: The deterministic forwarding engine
//! - `clock`: The tick pipeline and simulation state
//! - `snapshot`: Immutable per-tick observable state
//! - `control`: Boundary-applied control requests and the paced runner
//! - `report`: Run summaries and parallel batch analysis
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dtnsim::clock::SimulationClock;
//! use dtnsim::config_loader;
//!
//! let config = config_loader::load_config("scenarios/convoy.yaml".as_ref())?;
//! let mut clock = SimulationClock::new(config)?;
//! for _ in 0..100 {
//!     let snapshot = clock.step();
//!     println!("tick {}: {} delivered", snapshot.tick, snapshot.counters.delivered);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Scenario Format
//!
//! Scenarios use YAML:
//!
//! ```yaml
//! general:
//!   seed: 42
//!   default_ttl: 60
//! nodes:
//!   - id: v1
//!     role: source
//!     buffer_capacity: 6
//! links:
//!   - a: v1
//!     b: v2
//!     kind: persistent
//! routing:
//!   mode: static
//!   routes:
//!     v1:
//!       hq: [v2]
//! traffic:
//!   - at: 0
//!     from: v1
//!     to: hq
//! ```
//!
//! ## Error Handling
//!
//! Malformed scenarios fail fast through `config::ValidationError` before
//! the first tick. Expected in-simulation events (full buffers, TTL expiry,
//! eviction) are counters in the snapshot, never errors. Invalid control
//! requests are rejected with `control::ControlError` and leave state
//! unchanged. Application binaries use `color_eyre` for error reporting
//! with context.

pub mod attack;
pub mod buffer;
pub mod bundle;
pub mod clock;
pub mod config;
pub mod config_loader;
pub mod control;
pub mod report;
pub mod routing;
pub mod snapshot;
pub mod topology;
