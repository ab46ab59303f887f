//! Standard group topology.
//!
//! Places nodes by the role announced in their replicated address
//! (`group^P^host:port` for the primary, `group^S^host:port` for secondaries)
//! and promotes the staged candidate on role change.
//!
//! # Role change
//!
//! 1. Take the staged candidate (no candidate, no change)
//! 2. Remove it from the secondaries if it is one
//! 3. Install it as primary
//! 4. Demote the prior primary to secondary, or drop it, per [`PromotionPolicy`]

use std::sync::Arc;

use corelib::{Node, ReplicaRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::group::Membership;
use crate::topology::GroupTopology;

/// What happens to the prior primary when a candidate is promoted.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// Keep it as a secondary if there is room.
    #[default]
    Demote,
    /// Drop it from the group.
    Evict,
}

/// Role-from-address topology with a configurable promotion policy.
#[derive(Debug, Clone, Default)]
pub struct StandardTopology {
    policy: PromotionPolicy,
}

impl StandardTopology {
    pub fn new(policy: PromotionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    /// Role of `node` if it belongs to `members`' group.
    fn role_in(members: &Membership, node: &Node) -> Option<ReplicaRole> {
        match node.address.group_name() {
            Some(group) if group == members.group_name() => node.address.role(),
            Some(group) => {
                warn!(node = %node, group, expected = members.group_name(), "node belongs to another group");
                None
            }
            None => {
                warn!(node = %node, group = members.group_name(), "node has no replica group");
                None
            }
        }
    }

    fn set_primary(members: &mut Membership, node: Arc<Node>) -> bool {
        if let Some(current) = members.primary() {
            if Arc::ptr_eq(current, &node) {
                return false;
            }
        }
        // Re-announced as primary after serving as a secondary.
        members.remove_secondary(&node);
        if let Some(prior) = members.replace_primary(Some(Arc::clone(&node))) {
            if *prior != *node {
                info!(group = members.group_name(), prior = %prior, primary = %node, "primary replaced");
            }
        }
        true
    }

    fn set_secondary(members: &mut Membership, node: Arc<Node>) -> bool {
        if let Some(prior) = members.replace_secondary(Arc::clone(&node)) {
            return !Arc::ptr_eq(&prior, &node);
        }
        if members.is_full() {
            warn!(group = members.group_name(), node = %node, "no free secondary slot, event ignored");
            return false;
        }
        if members.primary().map_or(false, |p| **p == *node) {
            members.replace_primary(None);
        }
        match members.push_secondary(node) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "secondary not added");
                false
            }
        }
    }
}

impl GroupTopology for StandardTopology {
    fn set_node(&self, members: &mut Membership, node: Arc<Node>) -> bool {
        match Self::role_in(members, &node) {
            Some(ReplicaRole::Primary) => Self::set_primary(members, node),
            Some(ReplicaRole::Secondary) => Self::set_secondary(members, node),
            None => false,
        }
    }

    fn delete_node(&self, members: &mut Membership, node: &Node) -> bool {
        if Self::role_in(members, node).is_none() {
            return false;
        }

        let removed = if members.primary().map_or(false, |p| **p == *node) {
            members.replace_primary(None);
            true
        } else {
            members.remove_secondary(node).is_some()
        };

        if removed && members.candidate().map_or(false, |c| **c == *node) {
            debug!(group = members.group_name(), node = %node, "staged candidate removed");
            members.set_candidate(None);
        }
        removed
    }

    fn change_role(&self, members: &mut Membership) -> bool {
        let candidate = match members.take_candidate() {
            Some(candidate) => candidate,
            None => {
                debug!(group = members.group_name(), "role change without a staged candidate");
                return false;
            }
        };
        if members.primary().map_or(false, |p| **p == *candidate) {
            // Nothing to promote; keep the candidate staged.
            members.set_candidate(Some(candidate));
            return false;
        }

        members.remove_secondary(&candidate);
        let prior = members.replace_primary(Some(Arc::clone(&candidate)));
        info!(group = members.group_name(), primary = %candidate, "candidate promoted to primary");

        if let Some(prior) = prior {
            match self.policy {
                PromotionPolicy::Demote => {
                    let name = prior.to_string();
                    if let Err(err) = members.push_secondary(prior) {
                        warn!(prior = %name, error = %err, "prior primary evicted");
                    }
                }
                PromotionPolicy::Evict => {
                    info!(group = members.group_name(), prior = %prior, "prior primary evicted");
                }
            }
        }
        true
    }

    fn name(&self) -> &'static str {
        "StandardTopology"
    }
}
