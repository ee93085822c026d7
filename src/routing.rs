//! Routing and forwarding engine.
//!
//! One forwarding pass runs per tick. Transfer opportunities are evaluated
//! in a fixed order (ascending sender node id, then ascending bundle id) so
//! the pass is free of order-dependent nondeterminism, and each bundle moves
//! at most one hop per tick. The pass is planned against projected buffer
//! occupancy and per-contact bandwidth budgets, then executed as atomic
//! custody transfers.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::attack::AttackSet;
use crate::bundle::Bundle;
use crate::topology::{ContactModel, Node, NodeId};

/// Next-hop selection for the forwarding engine.
#[derive(Debug, Clone)]
pub enum RoutingTable {
    /// Per node, per destination, an ordered list of candidate next hops.
    /// Candidates are tried in order; the first one with an up contact and
    /// admission room wins.
    Static {
        routes: BTreeMap<NodeId, BTreeMap<NodeId, Vec<NodeId>>>,
    },
    /// Forward to the first available contact peer, in ascending id order.
    /// Bundles still move (never copy), preserving single ownership.
    Flood,
}

impl RoutingTable {
    /// Candidate next hops for a bundle held at `at` addressed to `dest`.
    pub fn candidates(&self, at: &str, dest: &str, contacts: &ContactModel) -> Vec<NodeId> {
        match self {
            RoutingTable::Static { routes } => routes
                .get(at)
                .and_then(|per_dest| per_dest.get(dest))
                .cloned()
                .unwrap_or_default(),
            RoutingTable::Flood => contacts.up_peers_of(at),
        }
    }
}

/// What happened to the bundles that left a buffer during one pass.
#[derive(Debug, Default)]
pub struct PassOutcome {
    /// Bundles that reached their destination this tick.
    pub delivered: Vec<Bundle>,
    /// Bundles accepted by a black hole and silently discarded. Ground
    /// truth for the test harness; invisible to in-simulation nodes.
    pub blackholed: Vec<Bundle>,
    /// Successful store-and-forward custody transfers.
    pub forwards: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Deliver,
    Discard,
    Store,
}

struct Transfer {
    bundle_id: u64,
    from: NodeId,
    to: NodeId,
    action: Action,
}

/// Run one forwarding pass over every up contact.
pub fn forwarding_pass(
    tick: u64,
    nodes: &mut BTreeMap<NodeId, Node>,
    contacts: &ContactModel,
    attacks: &AttackSet,
    table: &RoutingTable,
) -> PassOutcome {
    let plan = plan_transfers(nodes, contacts, attacks, table);
    if !plan.is_empty() {
        debug!("tick {}: {} transfer(s) planned", tick, plan.len());
    }
    execute_transfers(plan, nodes)
}

/// Evaluate transfer opportunities in fixed order against projected state.
fn plan_transfers(
    nodes: &BTreeMap<NodeId, Node>,
    contacts: &ContactModel,
    attacks: &AttackSet,
    table: &RoutingTable,
) -> Vec<Transfer> {
    let mut plan = Vec::new();
    // Bandwidth remaining per contact and projected occupancy per receiver,
    // both consumed as transfers are planned within this tick.
    let mut budgets: HashMap<usize, u32> = HashMap::new();
    let mut projected: BTreeMap<&str, u64> = nodes
        .iter()
        .map(|(id, node)| (id.as_str(), node.buffer.used()))
        .collect();
    let mut moved: HashSet<u64> = HashSet::new();

    // BTreeMap iteration gives ascending sender id order.
    for (sender_id, sender) in nodes.iter() {
        if attacks.outage(sender_id) {
            continue;
        }
        for bundle_id in sender.buffer.bundle_ids() {
            if moved.contains(&bundle_id) {
                continue;
            }
            let Some(bundle) = sender.buffer.get(bundle_id) else {
                continue;
            };
            for hop in table.candidates(sender_id, &bundle.destination, contacts) {
                if hop == *sender_id {
                    continue;
                }
                let Some(index) = contacts.index_of(sender_id, &hop) else {
                    continue;
                };
                let contact = &contacts.contacts()[index];
                if !contact.up {
                    continue;
                }
                let budget = budgets.entry(index).or_insert(contact.bandwidth);
                if *budget == 0 {
                    continue;
                }
                if attacks.outage(&hop) {
                    continue;
                }

                let action = if attacks.black_hole(&hop) {
                    // Accepted and swallowed; no admission needed.
                    Action::Discard
                } else if hop == bundle.destination {
                    Action::Deliver
                } else {
                    let room = nodes
                        .get(&hop)
                        .map(|n| n.buffer.effective_capacity())
                        .unwrap_or(0);
                    let used = projected.get(hop.as_str()).copied().unwrap_or(0);
                    if used.saturating_add(bundle.size) > room {
                        debug!(
                            "no room at {} for bundle {} ({} + {} > {})",
                            hop, bundle_id, used, bundle.size, room
                        );
                        continue;
                    }
                    Action::Store
                };

                *budget -= 1;
                if action == Action::Store {
                    if let Some(used) = projected.get_mut(hop.as_str()) {
                        *used += bundle.size;
                    }
                }
                moved.insert(bundle_id);
                plan.push(Transfer {
                    bundle_id,
                    from: sender_id.clone(),
                    to: hop,
                    action,
                });
                break;
            }
        }
    }
    plan
}

/// Execute planned transfers as atomic custody moves.
fn execute_transfers(plan: Vec<Transfer>, nodes: &mut BTreeMap<NodeId, Node>) -> PassOutcome {
    let mut outcome = PassOutcome::default();
    for transfer in plan {
        let Some(sender) = nodes.get_mut(&transfer.from) else {
            continue;
        };
        // Custody-deletion policy: a forwarded bundle leaves the sender
        // unconditionally; no shadow copy is retained.
        let Some(mut bundle) = sender.buffer.remove(transfer.bundle_id) else {
            continue;
        };
        bundle.record_custody(&transfer.to);
        match transfer.action {
            Action::Deliver => {
                bundle.delivered = true;
                debug!("bundle {} delivered at {}", bundle.id, transfer.to);
                outcome.delivered.push(bundle);
            }
            Action::Discard => {
                // Silent by design: no drop event is reported to the sender.
                outcome.blackholed.push(bundle);
            }
            Action::Store => match nodes.get_mut(&transfer.to) {
                Some(receiver) => match receiver.buffer.admit(bundle) {
                    Ok(()) => {
                        outcome.forwards += 1;
                    }
                    Err(mut bundle) => {
                        // Planned room vanished; the transfer never happened.
                        bundle.custody.pop();
                        debug!(
                            "admission at {} fell through, bundle {} stays at {}",
                            transfer.to, bundle.id, transfer.from
                        );
                        if let Some(sender) = nodes.get_mut(&transfer.from) {
                            let _ = sender.buffer.admit(bundle);
                        }
                    }
                },
                None => {
                    bundle.custody.pop();
                    if let Some(sender) = nodes.get_mut(&transfer.from) {
                        let _ = sender.buffer.admit(bundle);
                    }
                }
            },
        }
    }
    outcome
}
