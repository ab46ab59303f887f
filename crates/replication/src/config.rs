//! Replica group configuration.
//!
//! A group can be described in JSON for tooling and tests:
//!
//! ```json
//! {
//!   "name": "g0",
//!   "promotion": "demote",
//!   "nodes": ["g0^P^10.0.0.1:11211", "g0^S^10.0.0.2:11211"],
//!   "down": ["g0^S^10.0.0.2:11211"]
//! }
//! ```
//!
//! `nodes` are registered in order, which fixes the secondary rotation order.
//! `down` lists nodes whose liveness flag starts out false.

use std::path::Path;
use std::sync::Arc;

use corelib::{Error, Node, NodeAddress, NodeId, ReplicaRole, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::group::{ReplicaGroup, MAX_SECONDARIES};
use crate::topology::{PromotionPolicy, StandardTopology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub promotion: PromotionPolicy,
    pub nodes: Vec<NodeAddress>,
    #[serde(default)]
    pub down: Vec<NodeAddress>,
}

impl GroupConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Check that the node list describes one valid group.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::EmptyGroupName);
        }

        let mut primaries = 0;
        let mut secondaries = 0;
        for (i, addr) in self.nodes.iter().enumerate() {
            match addr.group_name() {
                None => return Err(Error::NotReplicated(addr.to_string())),
                Some(group) if group != self.name => {
                    return Err(Error::GroupMismatch {
                        expected: self.name.clone(),
                        found: group.to_string(),
                    })
                }
                Some(_) => {}
            }
            if self.nodes[..i].iter().any(|a| a.endpoint() == addr.endpoint()) {
                return Err(Error::Config(format!("node {} listed twice", addr.endpoint())));
            }
            match addr.role() {
                Some(ReplicaRole::Primary) => primaries += 1,
                _ => secondaries += 1,
            }
        }

        if primaries > 1 {
            return Err(Error::Config(format!("group {} lists {} primaries", self.name, primaries)));
        }
        if secondaries > MAX_SECONDARIES {
            return Err(Error::GroupFull {
                group: self.name.clone(),
                capacity: MAX_SECONDARIES,
            });
        }
        if let Some(unknown) = self.down.iter().find(|d| !self.nodes.contains(d)) {
            return Err(Error::Config(format!("down node {} is not a member", unknown)));
        }
        Ok(())
    }
}

impl ReplicaGroup {
    /// Build a group from its configuration, using [`StandardTopology`] with
    /// the configured promotion policy.
    ///
    /// Node ids are assigned from list position.
    pub fn from_config(config: &GroupConfig) -> Result<Self> {
        config.validate()?;

        let topology = Arc::new(StandardTopology::new(config.promotion));
        let mut group = ReplicaGroup::new(config.name.clone(), topology)?;
        for (i, addr) in config.nodes.iter().enumerate() {
            let node = Arc::new(Node::new(NodeId(i as u64), addr.clone()));
            node.set_active(!config.down.contains(addr));
            let added = group.set_node(node);
            // validate() rules out foreign, duplicate and overflowing nodes.
            debug_assert!(added, "validated node {} was not added", addr);
        }
        debug!(group = %group.name(), members = %group, "replica group loaded from config");
        Ok(group)
    }
}
