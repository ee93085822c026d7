//! Bundle data entity.
//!
//! A bundle is the unit of data moved through the simulated network. It is
//! created at a source node, carried hop by hop under custody of exactly one
//! buffer at a time, and either delivered at its destination or dropped.

use serde::{Deserialize, Serialize};

use crate::topology::NodeId;

/// A store-and-forward data bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bundle {
    /// Unique, monotonically assigned identifier.
    pub id: u64,
    /// Node that created the bundle.
    pub source: NodeId,
    /// Final destination node.
    pub destination: NodeId,
    /// Payload size in capacity units.
    pub size: u64,
    /// Tick at which the bundle was created.
    pub created_at: u64,
    /// Absolute tick at which the bundle expires if still undelivered.
    pub expires_at: u64,
    /// Ordered sequence of nodes that have held custody, starting with the source.
    pub custody: Vec<NodeId>,
    /// Terminal flag: set exactly once, when the bundle reaches its destination.
    pub delivered: bool,
}

impl Bundle {
    /// Create a new bundle with custody starting at the source node.
    pub fn new(
        id: u64,
        source: &str,
        destination: &str,
        size: u64,
        created_at: u64,
        ttl: u64,
    ) -> Self {
        Self {
            id,
            source: source.to_string(),
            destination: destination.to_string(),
            size,
            created_at,
            expires_at: created_at.saturating_add(ttl),
            custody: vec![source.to_string()],
            delivered: false,
        }
    }

    /// Ticks elapsed since creation.
    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.created_at)
    }

    /// Whether the bundle's TTL has elapsed at the given tick.
    pub fn has_expired(&self, tick: u64) -> bool {
        tick >= self.expires_at
    }

    /// Record a custody transfer to the given node.
    pub fn record_custody(&mut self, node_id: &str) {
        self.custody.push(node_id.to_string());
    }

    /// The node currently responsible for the bundle.
    pub fn custodian(&self) -> &str {
        self.custody
            .last()
            .map(String::as_str)
            .unwrap_or(self.source.as_str())
    }
}
