//! Registry of replica groups keyed by group name.
//!
//! The registry is where topology events from cluster discovery land. It
//! routes each node to its group by the group name in the node's address,
//! creates groups on first sight and drops them once they become empty.
//!
//! Each group sits behind its own mutex, so selection against one group is
//! serialized while different groups proceed independently.

use std::sync::Arc;

use corelib::{group_name_of, Node, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::group::ReplicaGroup;
use crate::pick::ReplicaPick;
use crate::topology::GroupTopology;

pub struct GroupRegistry {
    groups: DashMap<String, Mutex<ReplicaGroup>>,
    topology: Arc<dyn GroupTopology>,
}

impl GroupRegistry {
    /// Create an empty registry whose groups all use `topology`.
    pub fn new(topology: Arc<dyn GroupTopology>) -> Self {
        Self {
            groups: DashMap::new(),
            topology,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Names of all known groups, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Register `node` with its group, creating the group if needed.
    ///
    /// Returns whether the group's membership changed.
    pub fn add_node(&self, node: Arc<Node>) -> Result<bool> {
        let name = group_name_of(&node)?;
        // Holding the entry keeps a concurrent remove_node from dropping the
        // group before the node lands in it.
        let group = match self.groups.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                let group = ReplicaGroup::new(name, Arc::clone(&self.topology))?;
                info!(group = %name, "replica group created");
                entry.insert(Mutex::new(group))
            }
        };
        let changed = group.lock().set_node(Arc::clone(&node));
        Ok(changed)
    }

    /// Remove `node` from its group, dropping the group once it is empty.
    ///
    /// Returns whether the group's membership changed.
    pub fn remove_node(&self, node: &Node) -> Result<bool> {
        let name = group_name_of(node)?;
        let changed = match self.groups.get(name) {
            Some(group) => group.lock().delete_node(node),
            None => return Ok(false),
        };

        if changed
            && self
                .groups
                .remove_if(name, |_, group| group.lock().is_empty_group())
                .is_some()
        {
            info!(group = %name, "empty replica group removed");
        }
        Ok(changed)
    }

    /// Stage `node` as the next primary of its group.
    ///
    /// Returns false if the group is unknown.
    pub fn stage_candidate(&self, node: Arc<Node>) -> Result<bool> {
        let name = group_name_of(&node)?;
        match self.groups.get(name) {
            Some(group) => {
                debug!(group = %name, candidate = %node, "primary candidate staged");
                group.lock().set_primary_candidate(Some(Arc::clone(&node)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run a role change on `group`. Returns whether one happened.
    pub fn change_role(&self, group: &str) -> bool {
        self.groups
            .get(group)
            .map_or(false, |g| g.lock().change_role())
    }

    /// Pick a node from `group`. `None` if the group is unknown or has no
    /// node to offer.
    pub fn select(&self, group: &str, pick: ReplicaPick) -> Option<Arc<Node>> {
        self.groups.get(group)?.lock().select(pick)
    }

    /// Membership of `group` rendered as `[primary, secondary, ...]`.
    pub fn describe(&self, group: &str) -> Option<String> {
        self.groups.get(group).map(|g| g.lock().to_string())
    }
}
