//! Simulation control flow.
//!
//! The runner owns the clock and is the only caller of `step()`. Control
//! requests (attack toggles, injections, pause/resume, step-once, reset,
//! quit) arrive over a channel and are drained at tick boundaries only, so
//! every step sees a consistent attack configuration throughout its phases.
//! Observers receive each published snapshot; they never touch live state.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use crate::attack::{AttackKind, AttackTarget};
use crate::clock::SimulationClock;
use crate::snapshot::Snapshot;

/// Rejection of an invalid control request. State is never changed by a
/// rejected request.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("unknown node '{0}'")]
    UnknownNode(String),
    #[error("no contact defined between '{0}' and '{1}'")]
    UnknownContact(String, String),
    #[error("{0} attack targets the wrong kind of object")]
    TargetMismatch(AttackKind),
    #[error("resource exhaustion requires drain_per_tick of at least 1")]
    MissingDrain,
}

/// Requests a presentation layer can enqueue between ticks.
#[derive(Debug, Clone)]
pub enum ControlRequest {
    Activate {
        kind: AttackKind,
        target: AttackTarget,
        drain_per_tick: Option<u64>,
        until: Option<u64>,
    },
    Deactivate {
        kind: AttackKind,
        target: AttackTarget,
    },
    Inject {
        from: String,
        to: String,
        count: u32,
    },
    Pause,
    Resume,
    StepOnce,
    Reset,
    Quit,
}

/// Sending half handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Sender<ControlRequest>,
}

impl ControlHandle {
    /// Enqueue a request for the next tick boundary. Returns false if the
    /// runner has already terminated.
    pub fn send(&self, request: ControlRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Drives the clock at a fixed cadence, applying control requests at tick
/// boundaries.
pub struct SimRunner {
    clock: SimulationClock,
    requests: Receiver<ControlRequest>,
    tick_interval: Option<Duration>,
    paused: bool,
    step_once: bool,
}

impl SimRunner {
    /// Wrap a clock, returning the runner and the control handle for it.
    pub fn new(clock: SimulationClock, tick_interval: Option<Duration>) -> (Self, ControlHandle) {
        let (tx, rx) = channel();
        (
            Self {
                clock,
                requests: rx,
                tick_interval,
                paused: false,
                step_once: false,
            },
            ControlHandle { tx },
        )
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Run until `max_ticks` steps have executed or a quit request arrives.
    ///
    /// Every published snapshot is passed to `observe`. Returns the clock so
    /// callers can inspect final state and ground-truth logs.
    pub fn run<F>(mut self, max_ticks: Option<u64>, mut observe: F) -> SimulationClock
    where
        F: FnMut(&Snapshot),
    {
        let mut steps: u64 = 0;
        loop {
            if let Flow::Quit = self.drain_requests() {
                info!("quit requested, stopping after {} tick(s)", steps);
                break;
            }

            if self.paused && !self.step_once {
                // Suspended without losing state; wait for the next request.
                thread::sleep(self.tick_interval.unwrap_or(Duration::from_millis(10)));
                continue;
            }
            self.step_once = false;

            let snapshot = self.clock.step();
            observe(&snapshot);
            steps += 1;

            if max_ticks.is_some_and(|max| steps >= max) {
                break;
            }
            if let Some(interval) = self.tick_interval {
                thread::sleep(interval);
            }
        }
        self.clock
    }

    /// Apply every pending request at this tick boundary.
    fn drain_requests(&mut self) -> Flow {
        loop {
            match self.requests.try_recv() {
                Ok(request) => {
                    if let Flow::Quit = self.handle(request) {
                        return Flow::Quit;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return Flow::Continue;
                }
            }
        }
    }

    fn handle(&mut self, request: ControlRequest) -> Flow {
        match request {
            ControlRequest::Activate {
                kind,
                target,
                drain_per_tick,
                until,
            } => {
                if let Err(err) = self.clock.activate_attack(kind, target, drain_per_tick, until) {
                    warn!("attack activation rejected: {}", err);
                }
            }
            ControlRequest::Deactivate { kind, target } => {
                if let Err(err) = self.clock.deactivate_attack(kind, target) {
                    warn!("attack deactivation rejected: {}", err);
                }
            }
            ControlRequest::Inject { from, to, count } => {
                match self.clock.inject(&from, &to, count) {
                    Ok(admitted) => info!("injected {} bundle(s) {} -> {}", admitted, from, to),
                    Err(err) => warn!("injection rejected: {}", err),
                }
            }
            ControlRequest::Pause => {
                self.paused = true;
                info!("paused at tick {}", self.clock.tick());
            }
            ControlRequest::Resume => {
                self.paused = false;
            }
            ControlRequest::StepOnce => {
                self.step_once = true;
            }
            ControlRequest::Reset => {
                self.clock.reset();
            }
            ControlRequest::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests_support::linear_scenario;

    #[test]
    fn test_run_fixed_tick_count() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, _handle) = SimRunner::new(clock, None);
        let mut seen = Vec::new();
        let clock = runner.run(Some(3), |s| seen.push(s.tick));
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(clock.tick(), 3);
    }

    #[test]
    fn test_quit_before_first_tick() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, handle) = SimRunner::new(clock, None);
        handle.send(ControlRequest::Quit);
        let clock = runner.run(Some(100), |_| {});
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.counters().created, 0);
    }

    #[test]
    fn test_step_once_while_paused() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, handle) = SimRunner::new(clock, None);
        handle.send(ControlRequest::Pause);
        handle.send(ControlRequest::StepOnce);
        let clock = runner.run(Some(1), |_| {});
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn test_toggles_apply_at_boundary() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, handle) = SimRunner::new(clock, None);
        handle.send(ControlRequest::Activate {
            kind: AttackKind::BlackHole,
            target: AttackTarget::Node("relay".to_string()),
            drain_per_tick: None,
            until: None,
        });
        let clock = runner.run(Some(3), |_| {});
        // The relay swallowed the bundle instead of delivering it
        assert_eq!(clock.counters().delivered, 0);
        assert_eq!(clock.counters().blackhole_lost, 1);
    }

    #[test]
    fn test_reset_request() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, handle) = SimRunner::new(clock, None);
        handle.send(ControlRequest::Reset);
        let clock = runner.run(Some(2), |_| {});
        // Reset before any step is a no-op on results
        assert_eq!(clock.counters().delivered, 1);
    }

    #[test]
    fn test_invalid_request_leaves_state_unchanged() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let (runner, handle) = SimRunner::new(clock, None);
        handle.send(ControlRequest::Inject {
            from: "nowhere".to_string(),
            to: "dst".to_string(),
            count: 1,
        });
        let clock = runner.run(Some(2), |_| {});
        // Only the scheduled bundle exists
        assert_eq!(clock.counters().created, 1);
    }
}
