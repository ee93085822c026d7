//! Attack types.
//!
//! Adversarial behaviors are a tagged variant applied to a node or contact
//! target. The routing engine, buffers, and contact model query the active
//! set; none of them know about specific attack subclasses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::topology::NodeId;

/// The adversarial behaviors a scenario can inject.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AttackKind {
    /// Target node accepts custody and silently discards.
    BlackHole,
    /// Target node's usable storage is drained while active.
    ResourceExhaustion,
    /// Target contact is forced down for the attack's duration.
    Jamming,
    /// Target node accepts no transfers in either direction.
    Outage,
}

impl AttackKind {
    /// Whether this kind targets a contact rather than a node.
    pub fn targets_contact(&self) -> bool {
        matches!(self, AttackKind::Jamming)
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackKind::BlackHole => write!(f, "black-hole"),
            AttackKind::ResourceExhaustion => write!(f, "resource-exhaustion"),
            AttackKind::Jamming => write!(f, "jamming"),
            AttackKind::Outage => write!(f, "outage"),
        }
    }
}

/// What an attack is aimed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttackTarget {
    Node(NodeId),
    Contact(NodeId, NodeId),
}

impl AttackTarget {
    /// Whether this target names the given contact pair, in either order.
    pub fn is_contact(&self, x: &str, y: &str) -> bool {
        match self {
            AttackTarget::Contact(a, b) => (a == x && b == y) || (a == y && b == x),
            AttackTarget::Node(_) => false,
        }
    }

    pub fn is_node(&self, id: &str) -> bool {
        matches!(self, AttackTarget::Node(n) if n == id)
    }

    /// Two targets match if they name the same node or the same unordered pair.
    pub fn matches(&self, other: &AttackTarget) -> bool {
        match (self, other) {
            (AttackTarget::Node(a), AttackTarget::Node(b)) => a == b,
            (AttackTarget::Contact(a, b), _) => other.is_contact(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for AttackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackTarget::Node(id) => write!(f, "node {}", id),
            AttackTarget::Contact(a, b) => write!(f, "contact {}<->{}", a, b),
        }
    }
}

/// A currently-active attack instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttack {
    pub kind: AttackKind,
    pub target: AttackTarget,
    /// Capacity units removed per tick; meaningful for resource exhaustion.
    pub drain_per_tick: u64,
    pub activated_at: u64,
    /// Tick at which the attack reverts, or indefinite until toggled off.
    pub deactivate_at: Option<u64>,
}
