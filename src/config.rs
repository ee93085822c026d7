//! Scenario configuration.
//!
//! Type-safe structures for the YAML scenario format: general settings,
//! node list, potential links, routing table, attack schedule, and traffic
//! schedule. `Config::validate` fails fast on malformed scenarios before
//! the first tick runs.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attack::{AttackKind, AttackTarget};
use crate::topology::{ContactKind, EligibilityRule, NodeRole};

/// Errors raised by scenario validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid node configuration: {0}")]
    InvalidNode(String),
    #[error("Invalid link configuration: {0}")]
    InvalidLink(String),
    #[error("Invalid routing configuration: {0}")]
    InvalidRouting(String),
    #[error("Invalid attack configuration: {0}")]
    InvalidAttack(String),
    #[error("Invalid traffic configuration: {0}")]
    InvalidTraffic(String),
}

/// Complete scenario description consumed by the simulation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub nodes: Vec<NodeConfig>,
    pub links: Vec<LinkConfig>,
    pub routing: RoutingConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attacks: Vec<AttackConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic: Vec<TrafficConfig>,
}

/// Shared general configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seed for the opportunistic-contact generator.
    #[serde(default)]
    pub seed: u64,
    /// Wall-clock pacing between ticks for real-time runs (e.g. "100ms").
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub tick_interval: Option<Duration>,
    /// TTL in ticks for bundles whose traffic entry does not override it.
    #[serde(default = "default_ttl")]
    pub default_ttl: u64,
    /// Payload size for bundles whose traffic entry does not override it.
    #[serde(default = "default_bundle_size")]
    pub default_bundle_size: u64,
}

fn default_ttl() -> u64 {
    50
}

fn default_bundle_size() -> u64 {
    1
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_interval: None,
            default_ttl: default_ttl(),
            default_bundle_size: default_bundle_size(),
        }
    }
}

/// One node in the scenario topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub role: NodeRole,
    pub buffer_capacity: u64,
    /// Geometry/reachability rule; defaults to always eligible.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub eligibility: EligibilityRule,
}

/// One potential link between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: String,
    pub b: String,
    pub kind: ContactKind,
    /// Per-tick success probability; required for opportunistic links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Max bundle transfers per tick while up.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: u32,
}

fn default_bandwidth() -> u32 {
    1
}

/// Routing strategy options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Scenario-defined next-hop candidate lists.
    Static,
    /// Forward to any available contact.
    Flood,
}

/// Routing table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub mode: RoutingMode,
    /// Per node, per destination, ordered next-hop candidates. Required for
    /// static mode, ignored for flood.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<BTreeMap<String, BTreeMap<String, Vec<String>>>>,
}

/// Attack target as written in scenario files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AttackTargetConfig {
    Node { node: String },
    Contact { contact: [String; 2] },
}

impl AttackTargetConfig {
    pub fn to_target(&self) -> AttackTarget {
        match self {
            AttackTargetConfig::Node { node } => AttackTarget::Node(node.clone()),
            AttackTargetConfig::Contact { contact } => {
                AttackTarget::Contact(contact[0].clone(), contact[1].clone())
            }
        }
    }
}

/// One scheduled attack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackConfig {
    pub kind: AttackKind,
    pub target: AttackTargetConfig,
    /// Activation tick.
    pub at: u64,
    /// Deactivation tick; indefinite when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    /// Capacity units drained per tick; required for resource exhaustion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain_per_tick: Option<u64>,
}

/// One scheduled bundle injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    pub at: u64,
    pub from: String,
    pub to: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

fn default_count() -> u32 {
    1
}

impl Config {
    /// Validate the scenario.
    ///
    /// Checks cross references (links, routes, attack targets, traffic
    /// endpoints), value ranges, and that every traffic destination is
    /// reachable, so the simulation never partially initializes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_general()?;
        let node_ids = self.validate_nodes()?;
        self.validate_links(&node_ids)?;
        self.validate_routing(&node_ids)?;
        self.validate_attacks(&node_ids)?;
        self.validate_traffic(&node_ids)?;
        Ok(())
    }

    fn validate_general(&self) -> Result<(), ValidationError> {
        if self.general.default_ttl == 0 {
            return Err(ValidationError::InvalidGeneral(
                "default_ttl must be at least 1 tick".to_string(),
            ));
        }
        if self.general.default_bundle_size == 0 {
            return Err(ValidationError::InvalidGeneral(
                "default_bundle_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_nodes(&self) -> Result<BTreeSet<String>, ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::InvalidNode(
                "scenario must define at least one node".to_string(),
            ));
        }
        let mut ids = BTreeSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(ValidationError::InvalidNode(
                    "node id cannot be empty".to_string(),
                ));
            }
            if !ids.insert(node.id.clone()) {
                return Err(ValidationError::InvalidNode(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            if node.buffer_capacity == 0 {
                return Err(ValidationError::InvalidNode(format!(
                    "node '{}' has zero buffer capacity",
                    node.id
                )));
            }
            if let EligibilityRule::Window { period, duty, .. } = node.eligibility {
                if period == 0 {
                    return Err(ValidationError::InvalidNode(format!(
                        "node '{}' eligibility window has zero period",
                        node.id
                    )));
                }
                if duty == 0 {
                    return Err(ValidationError::InvalidNode(format!(
                        "node '{}' eligibility window has zero duty (never eligible)",
                        node.id
                    )));
                }
            }
        }
        Ok(ids)
    }

    fn validate_links(&self, node_ids: &BTreeSet<String>) -> Result<(), ValidationError> {
        let mut pairs = HashSet::new();
        for link in &self.links {
            for end in [&link.a, &link.b] {
                if !node_ids.contains(end) {
                    return Err(ValidationError::InvalidLink(format!(
                        "link references unknown node '{}'",
                        end
                    )));
                }
            }
            if link.a == link.b {
                return Err(ValidationError::InvalidLink(format!(
                    "link connects node '{}' to itself",
                    link.a
                )));
            }
            let mut pair = [link.a.clone(), link.b.clone()];
            pair.sort();
            if !pairs.insert(pair) {
                return Err(ValidationError::InvalidLink(format!(
                    "duplicate link between '{}' and '{}'",
                    link.a, link.b
                )));
            }
            if link.bandwidth == 0 {
                return Err(ValidationError::InvalidLink(format!(
                    "link '{}'-'{}' has zero bandwidth",
                    link.a, link.b
                )));
            }
            if link.kind == ContactKind::Opportunistic {
                match link.probability {
                    Some(p) if p > 0.0 && p <= 1.0 => {}
                    Some(p) => {
                        return Err(ValidationError::InvalidLink(format!(
                            "link '{}'-'{}' probability {} outside (0, 1]",
                            link.a, link.b, p
                        )));
                    }
                    None => {
                        return Err(ValidationError::InvalidLink(format!(
                            "opportunistic link '{}'-'{}' requires a probability",
                            link.a, link.b
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_routing(&self, node_ids: &BTreeSet<String>) -> Result<(), ValidationError> {
        match self.routing.mode {
            RoutingMode::Flood => Ok(()),
            RoutingMode::Static => {
                let Some(routes) = &self.routing.routes else {
                    return Err(ValidationError::InvalidRouting(
                        "static routing requires a routes table".to_string(),
                    ));
                };
                for (at, per_dest) in routes {
                    if !node_ids.contains(at) {
                        return Err(ValidationError::InvalidRouting(format!(
                            "routes defined for unknown node '{}'",
                            at
                        )));
                    }
                    for (dest, hops) in per_dest {
                        if !node_ids.contains(dest) {
                            return Err(ValidationError::InvalidRouting(format!(
                                "route at '{}' names unknown destination '{}'",
                                at, dest
                            )));
                        }
                        if hops.is_empty() {
                            return Err(ValidationError::InvalidRouting(format!(
                                "route '{}' -> '{}' has no next-hop candidates",
                                at, dest
                            )));
                        }
                        for hop in hops {
                            if !node_ids.contains(hop) {
                                return Err(ValidationError::InvalidRouting(format!(
                                    "route '{}' -> '{}' names unknown next hop '{}'",
                                    at, dest, hop
                                )));
                            }
                            if !self.has_link(at, hop) {
                                return Err(ValidationError::InvalidRouting(format!(
                                    "route '{}' -> '{}' uses next hop '{}' with no defined link",
                                    at, dest, hop
                                )));
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn validate_attacks(&self, node_ids: &BTreeSet<String>) -> Result<(), ValidationError> {
        for attack in &self.attacks {
            match (&attack.target, attack.kind.targets_contact()) {
                (AttackTargetConfig::Node { node }, false) => {
                    if !node_ids.contains(node) {
                        return Err(ValidationError::InvalidAttack(format!(
                            "{} attack targets unknown node '{}'",
                            attack.kind, node
                        )));
                    }
                }
                (AttackTargetConfig::Contact { contact }, true) => {
                    if !self.has_link(&contact[0], &contact[1]) {
                        return Err(ValidationError::InvalidAttack(format!(
                            "jamming targets undefined contact '{}'-'{}'",
                            contact[0], contact[1]
                        )));
                    }
                }
                (AttackTargetConfig::Node { .. }, true) => {
                    return Err(ValidationError::InvalidAttack(format!(
                        "{} attack requires a contact target",
                        attack.kind
                    )));
                }
                (AttackTargetConfig::Contact { .. }, false) => {
                    return Err(ValidationError::InvalidAttack(format!(
                        "{} attack requires a node target",
                        attack.kind
                    )));
                }
            }
            if let Some(until) = attack.until {
                if until <= attack.at {
                    return Err(ValidationError::InvalidAttack(format!(
                        "{} attack deactivates at tick {} but activates at tick {}",
                        attack.kind, until, attack.at
                    )));
                }
            }
            if attack.kind == AttackKind::ResourceExhaustion
                && attack.drain_per_tick.unwrap_or(0) == 0
            {
                return Err(ValidationError::InvalidAttack(
                    "resource exhaustion requires drain_per_tick of at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn validate_traffic(&self, node_ids: &BTreeSet<String>) -> Result<(), ValidationError> {
        for entry in &self.traffic {
            for end in [&entry.from, &entry.to] {
                if !node_ids.contains(end) {
                    return Err(ValidationError::InvalidTraffic(format!(
                        "traffic references unknown node '{}'",
                        end
                    )));
                }
            }
            if entry.from == entry.to {
                return Err(ValidationError::InvalidTraffic(format!(
                    "traffic from '{}' to itself",
                    entry.from
                )));
            }
            if entry.count == 0 {
                return Err(ValidationError::InvalidTraffic(
                    "traffic count must be at least 1".to_string(),
                ));
            }
            if entry.size == Some(0) || entry.ttl == Some(0) {
                return Err(ValidationError::InvalidTraffic(format!(
                    "traffic at tick {} has zero size or ttl",
                    entry.at
                )));
            }
            if !self.reachable(&entry.from, &entry.to) {
                return Err(ValidationError::InvalidTraffic(format!(
                    "destination '{}' is unreachable from '{}' with no route",
                    entry.to, entry.from
                )));
            }
        }
        Ok(())
    }

    /// Whether a potential link is defined between the two nodes.
    pub fn has_link(&self, x: &str, y: &str) -> bool {
        self.links
            .iter()
            .any(|l| (l.a == x && l.b == y) || (l.a == y && l.b == x))
    }

    /// Breadth-first reachability over the routing graph: candidate next
    /// hops for static mode, the raw link graph for flood mode.
    fn reachable(&self, from: &str, to: &str) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        seen.insert(from);
        while let Some(at) = queue.pop_front() {
            if at == to {
                return true;
            }
            let hops: Vec<&str> = match self.routing.mode {
                RoutingMode::Static => self
                    .routing
                    .routes
                    .as_ref()
                    .and_then(|routes| routes.get(at))
                    .and_then(|per_dest| per_dest.get(to))
                    .map(|hops| hops.iter().map(String::as_str).collect())
                    .unwrap_or_default(),
                RoutingMode::Flood => self
                    .links
                    .iter()
                    .filter_map(|l| {
                        if l.a == at {
                            Some(l.b.as_str())
                        } else if l.b == at {
                            Some(l.a.as_str())
                        } else {
                            None
                        }
                    })
                    .collect(),
            };
            for hop in hops {
                if seen.insert(hop) {
                    queue.push_back(hop);
                }
            }
        }
        false
    }
}
