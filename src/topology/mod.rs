//! Network topology module.
//!
//! This module contains the node and contact types that make up a scenario
//! topology, together with the per-tick contact resolution model.

pub mod contacts;
pub mod types;

// Re-export key types for easier access
pub use contacts::ContactModel;
pub use types::{Contact, ContactKind, EligibilityRule, Node, NodeId, NodeRole};
