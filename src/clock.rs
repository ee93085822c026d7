//! Simulation clock.
//!
//! The clock owns the entire simulation state and is its sole mutator. Each
//! `step()` runs the fixed tick pipeline: boundary actions (scheduled
//! attacks and traffic), contact resolution, attack effects, one forwarding
//! pass, TTL expiry, and snapshot publication. Nothing outside `step()`
//! mutates nodes, buffers, or contacts while the simulation runs.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::attack::{ActiveAttack, AttackKind, AttackSet, AttackTarget};
use crate::bundle::Bundle;
use crate::config::{Config, RoutingMode, ValidationError};
use crate::control::ControlError;
use crate::routing::{forwarding_pass, RoutingTable};
use crate::snapshot::{BundleSnapshot, ContactSnapshot, Counters, NodeSnapshot, Snapshot};
use crate::topology::{Contact, ContactModel, Node, NodeId};

/// The discrete-tick simulation engine.
pub struct SimulationClock {
    config: Config,
    tick: u64,
    next_bundle_id: u64,
    nodes: BTreeMap<NodeId, Node>,
    contacts: ContactModel,
    attacks: AttackSet,
    table: RoutingTable,
    counters: Counters,
    delivered_log: Vec<Bundle>,
    blackhole_log: Vec<Bundle>,
}

impl SimulationClock {
    /// Build a simulation from a validated scenario.
    ///
    /// Fails fast on malformed configuration; no partially-initialized
    /// simulation is ever returned.
    pub fn new(config: Config) -> Result<Self, ValidationError> {
        config.validate()?;
        let nodes = build_nodes(&config);
        let contacts = build_contacts(&config);
        let table = build_table(&config);
        info!(
            "scenario ready: {} nodes, {} links, seed {}",
            nodes.len(),
            contacts.contacts().len(),
            config.general.seed
        );
        Ok(Self {
            config,
            tick: 0,
            next_bundle_id: 1,
            nodes,
            contacts,
            attacks: AttackSet::new(),
            table,
            counters: Counters::default(),
            delivered_log: Vec::new(),
            blackhole_log: Vec::new(),
        })
    }

    /// The next tick to be processed.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    /// Bundles that reached their destination, in delivery order.
    pub fn delivered(&self) -> &[Bundle] {
        &self.delivered_log
    }

    /// Ground-truth record of bundles swallowed by black holes.
    pub fn blackhole_lost(&self) -> &[Bundle] {
        &self.blackhole_log
    }

    /// Advance the simulation by one tick and publish the snapshot.
    pub fn step(&mut self) -> Snapshot {
        let tick = self.tick;

        // Boundary: scheduled attack transitions and traffic, so the whole
        // step sees one consistent configuration.
        self.attacks.expire_due(tick, &mut self.nodes);
        self.apply_attack_schedule(tick);
        self.inject_scheduled_traffic(tick);

        // (a) resolve contact states for this tick
        self.contacts.resolve(tick, &self.nodes);

        // (b) attack effects on contacts and buffers
        let evicted = self.attacks.apply(tick, &mut self.nodes, &mut self.contacts);
        self.counters.evicted += evicted.len() as u64;

        // (c) one routing/forwarding pass
        let outcome = forwarding_pass(tick, &mut self.nodes, &self.contacts, &self.attacks, &self.table);
        self.counters.delivered += outcome.delivered.len() as u64;
        self.counters.forwarded += outcome.forwards;
        self.counters.blackhole_lost += outcome.blackholed.len() as u64;
        self.delivered_log.extend(outcome.delivered);
        self.blackhole_log.extend(outcome.blackholed);

        // (d) TTL expiry from every buffer, reported as drops
        for node in self.nodes.values_mut() {
            let expired = node.buffer.expire(tick);
            if !expired.is_empty() {
                debug!("tick {}: {} bundle(s) expired at {}", tick, expired.len(), node.id);
            }
            self.counters.expired += expired.len() as u64;
        }

        // (e) publish
        let snapshot = self.snapshot_at(tick);
        self.tick = tick + 1;
        snapshot
    }

    /// The externally-observable state as of the last processed tick.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(self.tick.saturating_sub(1))
    }

    /// Activate an attack at the next tick boundary.
    ///
    /// Activation is idempotent; returns whether a new activation occurred.
    pub fn activate_attack(
        &mut self,
        kind: AttackKind,
        target: AttackTarget,
        drain_per_tick: Option<u64>,
        until: Option<u64>,
    ) -> Result<bool, ControlError> {
        self.check_target(kind, &target)?;
        if kind == AttackKind::ResourceExhaustion && drain_per_tick.unwrap_or(0) == 0 {
            return Err(ControlError::MissingDrain);
        }
        Ok(self.activate_internal(ActiveAttack {
            kind,
            target,
            drain_per_tick: drain_per_tick.unwrap_or(0),
            activated_at: self.tick,
            deactivate_at: until,
        }))
    }

    /// Deactivate an attack; idempotent.
    pub fn deactivate_attack(
        &mut self,
        kind: AttackKind,
        target: AttackTarget,
    ) -> Result<bool, ControlError> {
        self.check_target(kind, &target)?;
        Ok(self.attacks.deactivate(kind, &target, &mut self.nodes))
    }

    /// Inject bundles from one node to another using scenario defaults.
    ///
    /// Returns the number of bundles admitted at the source. Bundles that
    /// do not fit the source buffer are not created.
    pub fn inject(&mut self, from: &str, to: &str, count: u32) -> Result<u32, ControlError> {
        if !self.nodes.contains_key(from) {
            return Err(ControlError::UnknownNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(ControlError::UnknownNode(to.to_string()));
        }
        let size = self.config.general.default_bundle_size;
        let ttl = self.config.general.default_ttl;
        Ok(self.create_bundles(from, to, count, size, ttl))
    }

    /// Discard all state and return to the scenario's initial topology.
    pub fn reset(&mut self) {
        info!("resetting simulation to initial state");
        self.tick = 0;
        self.next_bundle_id = 1;
        self.nodes = build_nodes(&self.config);
        self.contacts = build_contacts(&self.config);
        self.attacks = AttackSet::new();
        self.counters = Counters::default();
        self.delivered_log.clear();
        self.blackhole_log.clear();
    }

    fn check_target(&self, kind: AttackKind, target: &AttackTarget) -> Result<(), ControlError> {
        match (target, kind.targets_contact()) {
            (AttackTarget::Node(id), false) => {
                if !self.nodes.contains_key(id) {
                    return Err(ControlError::UnknownNode(id.clone()));
                }
            }
            (AttackTarget::Contact(a, b), true) => {
                if !self.contacts.has_link(a, b) {
                    return Err(ControlError::UnknownContact(a.clone(), b.clone()));
                }
            }
            _ => return Err(ControlError::TargetMismatch(kind)),
        }
        Ok(())
    }

    fn activate_internal(&mut self, attack: ActiveAttack) -> bool {
        let kind = attack.kind;
        let target = attack.target.clone();
        let fresh = self.attacks.activate(attack);
        if fresh && kind == AttackKind::BlackHole {
            // A node turning black hole swallows whatever it already holds.
            if let AttackTarget::Node(id) = &target {
                if let Some(node) = self.nodes.get_mut(id) {
                    let swallowed = node.buffer.clear();
                    self.counters.blackhole_lost += swallowed.len() as u64;
                    self.blackhole_log.extend(swallowed);
                }
            }
        }
        fresh
    }

    fn apply_attack_schedule(&mut self, tick: u64) {
        let due: Vec<ActiveAttack> = self
            .config
            .attacks
            .iter()
            .filter(|a| a.at == tick)
            .map(|a| ActiveAttack {
                kind: a.kind,
                target: a.target.to_target(),
                drain_per_tick: a.drain_per_tick.unwrap_or(0),
                activated_at: tick,
                deactivate_at: a.until,
            })
            .collect();
        for attack in due {
            self.activate_internal(attack);
        }
    }

    fn inject_scheduled_traffic(&mut self, tick: u64) {
        let due: Vec<(String, String, u32, u64, u64)> = self
            .config
            .traffic
            .iter()
            .filter(|t| t.at == tick)
            .map(|t| {
                (
                    t.from.clone(),
                    t.to.clone(),
                    t.count,
                    t.size.unwrap_or(self.config.general.default_bundle_size),
                    t.ttl.unwrap_or(self.config.general.default_ttl),
                )
            })
            .collect();
        for (from, to, count, size, ttl) in due {
            self.create_bundles(&from, &to, count, size, ttl);
        }
    }

    fn create_bundles(&mut self, from: &str, to: &str, count: u32, size: u64, ttl: u64) -> u32 {
        let mut admitted = 0;
        for _ in 0..count {
            let bundle = Bundle::new(self.next_bundle_id, from, to, size, self.tick, ttl);
            let Some(source) = self.nodes.get_mut(from) else {
                break;
            };
            match source.buffer.admit(bundle) {
                Ok(()) => {
                    debug!("bundle {} created at {} for {}", self.next_bundle_id, from, to);
                    self.next_bundle_id += 1;
                    self.counters.created += 1;
                    admitted += 1;
                }
                Err(bundle) => {
                    warn!(
                        "source {} has no room for new bundle ({} units), not created",
                        from, bundle.size
                    );
                    break;
                }
            }
        }
        admitted
    }

    fn is_complete(&self, tick: u64) -> bool {
        let schedule_exhausted = self.config.traffic.iter().all(|t| t.at <= tick);
        schedule_exhausted && self.nodes.values().all(|n| n.buffer.is_empty())
    }

    fn snapshot_at(&self, tick: u64) -> Snapshot {
        let nodes = self
            .nodes
            .values()
            .map(|node| NodeSnapshot {
                id: node.id.clone(),
                role: node.role,
                used: node.buffer.used(),
                capacity: node.buffer.capacity(),
                effective_capacity: node.buffer.effective_capacity(),
                attack: self.attacks.node_kind(&node.id),
                bundles: node
                    .buffer
                    .iter()
                    .map(|b| BundleSnapshot {
                        id: b.id,
                        size: b.size,
                        age: b.age(tick),
                        destination: b.destination.clone(),
                    })
                    .collect(),
            })
            .collect();
        let contacts = self
            .contacts
            .contacts()
            .iter()
            .map(|c| ContactSnapshot {
                a: c.a.clone(),
                b: c.b.clone(),
                kind: c.kind,
                up: c.up,
            })
            .collect();
        Snapshot {
            tick,
            complete: self.is_complete(tick),
            nodes,
            contacts,
            counters: self.counters,
        }
    }
}

fn build_nodes(config: &Config) -> BTreeMap<NodeId, Node> {
    config
        .nodes
        .iter()
        .map(|n| {
            (
                n.id.clone(),
                Node::new(&n.id, n.role, n.buffer_capacity, n.eligibility.clone()),
            )
        })
        .collect()
}

fn build_contacts(config: &Config) -> ContactModel {
    let contacts: Vec<Contact> = config
        .links
        .iter()
        .map(|l| Contact {
            a: l.a.clone(),
            b: l.b.clone(),
            kind: l.kind,
            probability: l.probability.unwrap_or(1.0),
            bandwidth: l.bandwidth,
            up: false,
        })
        .collect();
    ContactModel::new(contacts, config.general.seed)
}

fn build_table(config: &Config) -> RoutingTable {
    match config.routing.mode {
        RoutingMode::Flood => RoutingTable::Flood,
        RoutingMode::Static => RoutingTable::Static {
            routes: config.routing.routes.clone().unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests_support::linear_scenario;

    #[test]
    fn test_linear_delivery_by_tick_two() {
        let mut clock = SimulationClock::new(linear_scenario()).unwrap();
        let s0 = clock.step();
        assert_eq!(s0.tick, 0);
        assert_eq!(s0.counters.created, 1);
        // After tick 0 the bundle sits at the relay
        assert_eq!(s0.node("relay").unwrap().bundles.len(), 1);

        let s1 = clock.step();
        assert_eq!(s1.counters.delivered, 1);
        assert!(s1.complete);
        assert_eq!(clock.delivered()[0].custody, vec!["src", "relay", "dst"]);
    }

    #[test]
    fn test_snapshot_before_first_step() {
        let clock = SimulationClock::new(linear_scenario()).unwrap();
        let snapshot = clock.snapshot();
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.counters.created, 0);
        assert_eq!(snapshot.bundles_in_flight(), 0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut clock = SimulationClock::new(linear_scenario()).unwrap();
        clock.step();
        clock.step();
        assert_eq!(clock.counters().delivered, 1);

        clock.reset();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.counters(), Counters::default());
        assert!(clock.delivered().is_empty());

        // A reset run replays identically
        clock.step();
        let s1 = clock.step();
        assert_eq!(s1.counters.delivered, 1);
    }

    #[test]
    fn test_invalid_attack_target_rejected_without_state_change() {
        let mut clock = SimulationClock::new(linear_scenario()).unwrap();
        let err = clock
            .activate_attack(
                AttackKind::BlackHole,
                AttackTarget::Node("ghost".to_string()),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ControlError::UnknownNode(_)));
        assert!(clock.attacks.is_empty());

        let err = clock
            .activate_attack(
                AttackKind::Jamming,
                AttackTarget::Node("relay".to_string()),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ControlError::TargetMismatch(_)));
    }

    #[test]
    fn test_manual_injection_uses_defaults() {
        let mut clock = SimulationClock::new(linear_scenario()).unwrap();
        let admitted = clock.inject("src", "dst", 1).unwrap();
        assert_eq!(admitted, 1);
        assert_eq!(clock.counters().created, 1);
        assert!(clock.inject("src", "nowhere", 1).is_err());
    }
}
