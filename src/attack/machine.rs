//! Attack activation state machines.
//!
//! Each attack is a small `inactive -> active -> inactive` machine keyed by
//! (kind, target). Activation and deactivation are idempotent, driven either
//! by the scenario schedule or by control requests, and reversion restores
//! the pre-attack baseline exactly.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::bundle::Bundle;
use crate::topology::{ContactModel, Node, NodeId};

use super::types::{ActiveAttack, AttackKind, AttackTarget};

/// The set of currently-active attacks, in activation order.
#[derive(Debug, Clone, Default)]
pub struct AttackSet {
    active: Vec<ActiveAttack>,
}

impl AttackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate an attack. Activating an already-active (kind, target) pair
    /// is a no-op; returns whether a new activation occurred.
    pub fn activate(&mut self, attack: ActiveAttack) -> bool {
        if self.is_active(attack.kind, &attack.target) {
            debug!(
                "attack {} on {} already active, ignoring",
                attack.kind, attack.target
            );
            return false;
        }
        info!("activating {} on {}", attack.kind, attack.target);
        self.active.push(attack);
        true
    }

    /// Deactivate an attack and revert its effect on the target.
    ///
    /// Deactivating an attack that is not active is a no-op; returns whether
    /// an active attack was removed.
    pub fn deactivate(
        &mut self,
        kind: AttackKind,
        target: &AttackTarget,
        nodes: &mut BTreeMap<NodeId, Node>,
    ) -> bool {
        let before = self.active.len();
        self.active
            .retain(|a| !(a.kind == kind && a.target.matches(target)));
        let removed = self.active.len() < before;
        if removed {
            info!("deactivating {} on {}", kind, target);
            Self::revert(kind, target, nodes);
        }
        removed
    }

    /// Remove attacks whose scheduled deactivation tick has arrived.
    pub fn expire_due(&mut self, tick: u64, nodes: &mut BTreeMap<NodeId, Node>) {
        let due: Vec<(AttackKind, AttackTarget)> = self
            .active
            .iter()
            .filter(|a| a.deactivate_at.is_some_and(|t| t <= tick))
            .map(|a| (a.kind, a.target.clone()))
            .collect();
        for (kind, target) in due {
            self.deactivate(kind, &target, nodes);
        }
    }

    /// Restore the target's baseline after an attack ends.
    ///
    /// Resource exhaustion clears the buffer drain (already-evicted bundles
    /// are not restored); jamming, black hole, and outage need no explicit
    /// reversion since their effects are recomputed or queried each tick.
    fn revert(kind: AttackKind, target: &AttackTarget, nodes: &mut BTreeMap<NodeId, Node>) {
        if kind == AttackKind::ResourceExhaustion {
            if let AttackTarget::Node(id) = target {
                if let Some(node) = nodes.get_mut(id) {
                    node.buffer.clear_drain();
                }
            }
        }
    }

    /// Apply per-tick effects of every active attack.
    ///
    /// Jamming forces its contact down for this tick; resource exhaustion
    /// advances the target's drain and evicts whatever no longer fits.
    /// Returns the bundles evicted by exhaustion, for drop accounting.
    pub fn apply(
        &mut self,
        tick: u64,
        nodes: &mut BTreeMap<NodeId, Node>,
        contacts: &mut ContactModel,
    ) -> Vec<Bundle> {
        let mut evicted = Vec::new();
        for attack in &self.active {
            match attack.kind {
                AttackKind::Jamming => {
                    if let AttackTarget::Contact(a, b) = &attack.target {
                        contacts.force_down(a, b);
                    }
                }
                AttackKind::ResourceExhaustion => {
                    if let AttackTarget::Node(id) = &attack.target {
                        if let Some(node) = nodes.get_mut(id) {
                            node.buffer.add_drain(attack.drain_per_tick);
                            let overflow = node.buffer.shrink_to_effective();
                            if !overflow.is_empty() {
                                debug!(
                                    "tick {}: exhaustion at {} evicted {} bundle(s)",
                                    tick,
                                    id,
                                    overflow.len()
                                );
                            }
                            evicted.extend(overflow);
                        }
                    }
                }
                // Queried by the routing engine each transfer
                AttackKind::BlackHole | AttackKind::Outage => {}
            }
        }
        evicted
    }

    pub fn is_active(&self, kind: AttackKind, target: &AttackTarget) -> bool {
        self.active
            .iter()
            .any(|a| a.kind == kind && a.target.matches(target))
    }

    /// Whether the node is an active black hole.
    pub fn black_hole(&self, node: &str) -> bool {
        self.active
            .iter()
            .any(|a| a.kind == AttackKind::BlackHole && a.target.is_node(node))
    }

    /// Whether the node is blocked by an active outage.
    pub fn outage(&self, node: &str) -> bool {
        self.active
            .iter()
            .any(|a| a.kind == AttackKind::Outage && a.target.is_node(node))
    }

    /// The first active node-targeted attack kind at the node, for snapshots.
    pub fn node_kind(&self, node: &str) -> Option<AttackKind> {
        self.active
            .iter()
            .find(|a| a.target.is_node(node))
            .map(|a| a.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveAttack> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop all active attacks and revert their effects.
    pub fn clear(&mut self, nodes: &mut BTreeMap<NodeId, Node>) {
        let all: Vec<(AttackKind, AttackTarget)> = self
            .active
            .iter()
            .map(|a| (a.kind, a.target.clone()))
            .collect();
        for (kind, target) in all {
            self.deactivate(kind, &target, nodes);
        }
    }
}
