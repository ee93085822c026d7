//! Per-tick simulation snapshots.
//!
//! A snapshot is the immutable, externally-observable state published at the
//! end of each tick: buffer contents, contact availability, active attacks,
//! and cumulative counters. Presentation layers render snapshots; they never
//! touch live simulation state. Snapshots serialize to JSON for NDJSON run
//! traces and deserialize back for offline analysis.

use serde::{Deserialize, Serialize};

use crate::attack::AttackKind;
use crate::topology::{ContactKind, NodeId, NodeRole};

/// Cumulative event counters across a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    /// Bundles injected into source buffers.
    pub created: u64,
    /// Bundles that reached their destination.
    pub delivered: u64,
    /// Successful store-and-forward custody transfers.
    pub forwarded: u64,
    /// Bundles dropped by TTL expiry.
    pub expired: u64,
    /// Bundles evicted under resource-exhaustion shrinkage.
    pub evicted: u64,
    /// Bundles silently lost to black holes. Tracked internally for the
    /// test harness; in-simulation nodes never observe this count.
    pub blackhole_lost: u64,
}

impl Counters {
    /// Bundles no longer circulating, for conservation accounting.
    pub fn accounted(&self) -> u64 {
        self.delivered + self.expired + self.evicted + self.blackhole_lost
    }
}

/// One bundle as seen in a buffer at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleSnapshot {
    pub id: u64,
    pub size: u64,
    /// Ticks since creation.
    pub age: u64,
    pub destination: NodeId,
}

/// One node's externally-visible state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub role: NodeRole,
    pub used: u64,
    pub capacity: u64,
    pub effective_capacity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackKind>,
    pub bundles: Vec<BundleSnapshot>,
}

/// One contact's resolved state for the tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactSnapshot {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: ContactKind,
    pub up: bool,
}

/// The complete published state for one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    /// All scheduled traffic injected and every bundle accounted for.
    /// Informational only; the clock keeps running.
    pub complete: bool,
    pub nodes: Vec<NodeSnapshot>,
    pub contacts: Vec<ContactSnapshot>,
    pub counters: Counters,
}

impl Snapshot {
    /// Total payload currently buffered across all nodes.
    pub fn total_buffered(&self) -> u64 {
        self.nodes.iter().map(|n| n.used).sum()
    }

    /// Number of bundles currently buffered across all nodes.
    pub fn bundles_in_flight(&self) -> usize {
        self.nodes.iter().map(|n| n.bundles.len()).sum()
    }

    pub fn node(&self, id: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contact(&self, x: &str, y: &str) -> Option<&ContactSnapshot> {
        self.contacts
            .iter()
            .find(|c| (c.a == x && c.b == y) || (c.a == y && c.b == x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accounted() {
        let counters = Counters {
            created: 10,
            delivered: 4,
            forwarded: 9,
            expired: 2,
            evicted: 1,
            blackhole_lost: 3,
        };
        assert_eq!(counters.accounted(), 10);
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = Snapshot {
            tick: 3,
            complete: false,
            nodes: vec![NodeSnapshot {
                id: "relay".to_string(),
                role: NodeRole::Relay,
                used: 2,
                capacity: 5,
                effective_capacity: 5,
                attack: Some(AttackKind::BlackHole),
                bundles: vec![BundleSnapshot {
                    id: 1,
                    size: 2,
                    age: 3,
                    destination: "dst".to_string(),
                }],
            }],
            contacts: vec![ContactSnapshot {
                a: "src".to_string(),
                b: "relay".to_string(),
                kind: ContactKind::Opportunistic,
                up: true,
            }],
            counters: Counters::default(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.node("relay").unwrap().attack, Some(AttackKind::BlackHole));
        assert!(parsed.contact("relay", "src").unwrap().up);
    }
}
