//! Per-tick contact resolution.
//!
//! The contact model owns the scenario's potential links and recomputes
//! their up/down state once per tick: persistent contacts are up unless an
//! attack forces them down, opportunistic contacts are re-rolled from their
//! success probability and gated by endpoint eligibility. Rolls come from a
//! seeded generator in a fixed contact order, so runs are reproducible.

use std::collections::BTreeMap;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{Contact, ContactKind, Node, NodeId};

/// Resolves contact availability each tick from a seeded generator.
#[derive(Debug, Clone)]
pub struct ContactModel {
    contacts: Vec<Contact>,
    rng: StdRng,
    seed: u64,
}

impl ContactModel {
    /// Build the model from the scenario's potential links.
    ///
    /// Contacts are kept sorted by endpoint pair so the random roll order is
    /// independent of scenario file ordering.
    pub fn new(mut contacts: Vec<Contact>, seed: u64) -> Self {
        contacts.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        Self {
            contacts,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Recompute every contact's state for the given tick.
    ///
    /// The resolved states are held fixed for the duration of the tick's
    /// routing pass; attack overlays may subsequently force individual
    /// contacts down before routing runs.
    pub fn resolve(&mut self, tick: u64, nodes: &BTreeMap<NodeId, Node>) {
        for contact in &mut self.contacts {
            match contact.kind {
                ContactKind::Persistent => {
                    contact.up = true;
                }
                ContactKind::Opportunistic => {
                    // Roll unconditionally so the random stream does not
                    // depend on eligibility or attack state.
                    let roll: f64 = self.rng.gen();
                    let a_eligible = nodes.get(&contact.a).is_some_and(|n| n.eligible(tick));
                    let b_eligible = nodes.get(&contact.b).is_some_and(|n| n.eligible(tick));
                    contact.up = a_eligible && b_eligible && roll < contact.probability;
                }
            }
        }
        debug!(
            "tick {}: {}/{} contacts up",
            tick,
            self.contacts.iter().filter(|c| c.up).count(),
            self.contacts.len()
        );
    }

    /// Force the contact between `x` and `y` down for the current tick.
    ///
    /// Returns false if no such potential link exists.
    pub fn force_down(&mut self, x: &str, y: &str) -> bool {
        match self.contacts.iter_mut().find(|c| c.connects(x, y)) {
            Some(contact) => {
                contact.up = false;
                true
            }
            None => false,
        }
    }

    /// All contacts in resolution order.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Whether a potential link is defined between the two nodes.
    pub fn has_link(&self, x: &str, y: &str) -> bool {
        self.contacts.iter().any(|c| c.connects(x, y))
    }

    /// The contact between two nodes, if defined.
    pub fn find(&self, x: &str, y: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.connects(x, y))
    }

    /// Index of the contact between two nodes, for per-tick bandwidth budgets.
    pub fn index_of(&self, x: &str, y: &str) -> Option<usize> {
        self.contacts.iter().position(|c| c.connects(x, y))
    }

    /// Far endpoints of every up contact at `node`, in ascending id order.
    pub fn up_peers_of(&self, node: &str) -> Vec<NodeId> {
        let mut peers: Vec<NodeId> = self
            .contacts
            .iter()
            .filter(|c| c.up)
            .filter_map(|c| c.peer_of(node))
            .map(str::to_string)
            .collect();
        peers.sort();
        peers
    }

    /// Restore the generator to its initial seeded state.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}
