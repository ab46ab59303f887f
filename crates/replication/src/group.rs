//! Replica group: membership plus the node-selection state machine.
//!
//! A group holds one primary slot and at most [`MAX_SECONDARIES`] secondaries.
//! Nodes are shared with the registry that discovered them; the group never
//! owns them and never changes their liveness.
//!
//! # Selection
//!
//! | Pick        | Result                                                        |
//! |-------------|---------------------------------------------------------------|
//! | Primary     | primary slot, verbatim                                        |
//! | Secondary   | next live secondary after `secondary_cursor`, else primary    |
//! | RoundRobin  | primary and the next live secondary, alternating              |
//!
//! Secondary scans are circular, skip nodes whose liveness flag is false and
//! probe each secondary at most once, so every call is O(secondaries).
//!
//! # Concurrency
//!
//! Selection advances cursors and therefore takes `&mut self`. Callers that
//! share a group across threads serialize access themselves (see
//! [`crate::registry::GroupRegistry`]).

use std::fmt;
use std::sync::Arc;

use corelib::{Error, Node, Result};
use tracing::{debug, trace};

use crate::pick::ReplicaPick;
use crate::topology::GroupTopology;

/// Maximum number of secondaries in one group.
pub const MAX_SECONDARIES: usize = 2;

/// Maximum number of nodes (primary plus secondaries) in one group.
pub const MAX_GROUP_SIZE: usize = MAX_SECONDARIES + 1;

/// Node slots of a replica group.
///
/// This is the part of a group a [`GroupTopology`] may rewrite. Capacity is
/// enforced here so no topology can overfill a group.
#[derive(Debug)]
pub struct Membership {
    group: String,
    primary: Option<Arc<Node>>,
    secondaries: Vec<Arc<Node>>,
    candidate: Option<Arc<Node>>,
}

impl Membership {
    fn new(group: String) -> Self {
        Self {
            group,
            primary: None,
            secondaries: Vec::with_capacity(MAX_SECONDARIES),
            candidate: None,
        }
    }

    pub fn group_name(&self) -> &str {
        &self.group
    }

    pub fn primary(&self) -> Option<&Arc<Node>> {
        self.primary.as_ref()
    }

    /// Replace the primary slot, returning the previous primary.
    pub fn replace_primary(&mut self, node: Option<Arc<Node>>) -> Option<Arc<Node>> {
        std::mem::replace(&mut self.primary, node)
    }

    pub fn secondaries(&self) -> &[Arc<Node>] {
        &self.secondaries
    }

    pub fn is_full(&self) -> bool {
        self.secondaries.len() >= MAX_SECONDARIES
    }

    /// Append a secondary at the end of the rotation order.
    pub fn push_secondary(&mut self, node: Arc<Node>) -> Result<()> {
        if self.is_full() {
            return Err(Error::GroupFull {
                group: self.group.clone(),
                capacity: MAX_SECONDARIES,
            });
        }
        self.secondaries.push(node);
        Ok(())
    }

    /// Swap in `node` for the secondary with the same id, keeping its position.
    pub fn replace_secondary(&mut self, node: Arc<Node>) -> Option<Arc<Node>> {
        let slot = self.secondaries.iter_mut().find(|s| ***s == *node)?;
        Some(std::mem::replace(slot, node))
    }

    /// Remove `node` from the secondaries, keeping the order of the rest.
    pub fn remove_secondary(&mut self, node: &Node) -> Option<Arc<Node>> {
        let pos = self.secondaries.iter().position(|s| **s == *node)?;
        Some(self.secondaries.remove(pos))
    }

    pub fn candidate(&self) -> Option<&Arc<Node>> {
        self.candidate.as_ref()
    }

    pub fn set_candidate(&mut self, node: Option<Arc<Node>>) {
        self.candidate = node;
    }

    pub fn take_candidate(&mut self) -> Option<Arc<Node>> {
        self.candidate.take()
    }
}

/// Which rotation cursor a secondary scan advances.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Rotation {
    Secondary,
    RoundRobin,
}

/// One primary plus up to two secondaries, with the rotation state used to
/// pick among them.
pub struct ReplicaGroup {
    members: Membership,
    topology: Arc<dyn GroupTopology>,
    secondary_cursor: usize,
    round_robin_cursor: usize,
    last_pick_was_primary: bool,
}

impl ReplicaGroup {
    /// Create an empty group.
    ///
    /// Fails with [`Error::EmptyGroupName`] if `name` is empty.
    pub fn new(name: impl Into<String>, topology: Arc<dyn GroupTopology>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyGroupName);
        }
        Ok(Self {
            members: Membership::new(name),
            topology,
            secondary_cursor: 0,
            round_robin_cursor: 0,
            last_pick_was_primary: false,
        })
    }

    pub fn name(&self) -> &str {
        self.members.group_name()
    }

    /// True iff the group has neither a primary nor any secondary.
    pub fn is_empty_group(&self) -> bool {
        self.members.primary.is_none() && self.members.secondaries.is_empty()
    }

    pub fn primary(&self) -> Option<&Arc<Node>> {
        self.members.primary()
    }

    pub fn secondaries(&self) -> &[Arc<Node>] {
        self.members.secondaries()
    }

    /// Secondary at `index` in rotation order.
    pub fn secondary_at(&self, index: usize) -> Result<&Arc<Node>> {
        let len = self.members.secondaries.len();
        self.members
            .secondaries
            .get(index)
            .ok_or(Error::SecondaryIndexOutOfRange { index, len })
    }

    pub fn primary_candidate(&self) -> Option<&Arc<Node>> {
        self.members.candidate()
    }

    /// Stage (or clear) the node to promote on the next [`change_role`](Self::change_role).
    pub fn set_primary_candidate(&mut self, node: Option<Arc<Node>>) {
        self.members.set_candidate(node);
    }

    pub fn topology(&self) -> &dyn GroupTopology {
        self.topology.as_ref()
    }

    pub fn secondary_cursor(&self) -> usize {
        self.secondary_cursor
    }

    pub fn round_robin_cursor(&self) -> usize {
        self.round_robin_cursor
    }

    pub fn last_pick_was_primary(&self) -> bool {
        self.last_pick_was_primary
    }

    /// Insert or update `node` in the slot its role designates.
    ///
    /// Returns whether membership changed.
    pub fn set_node(&mut self, node: Arc<Node>) -> bool {
        let changed = self.topology.set_node(&mut self.members, node);
        self.after_mutation("set_node", changed)
    }

    /// Remove `node` from the group. Returns whether membership changed.
    pub fn delete_node(&mut self, node: &Node) -> bool {
        let changed = self.topology.delete_node(&mut self.members, node);
        self.after_mutation("delete_node", changed)
    }

    /// Promote the staged candidate to primary.
    ///
    /// Returns whether a role change happened.
    pub fn change_role(&mut self) -> bool {
        let changed = self.topology.change_role(&mut self.members);
        self.after_mutation("change_role", changed)
    }

    fn after_mutation(&mut self, op: &'static str, changed: bool) -> bool {
        // Topologies may shrink the secondaries without reporting it.
        self.clamp_cursors();
        if changed {
            debug!(group = %self.name(), op, members = %self, "replica group membership changed");
        }
        changed
    }

    /// Pull both cursors back into `[0, len)`, or to 0 for an empty list.
    fn clamp_cursors(&mut self) {
        let len = self.members.secondaries.len();
        if self.secondary_cursor >= len {
            self.secondary_cursor = 0;
        }
        if self.round_robin_cursor >= len {
            self.round_robin_cursor = 0;
        }
    }

    /// Pick the node that should serve one operation.
    ///
    /// Returns `None` only when there is no primary and no live secondary;
    /// callers treat that as "no route", not as an error.
    pub fn select(&mut self, pick: ReplicaPick) -> Option<Arc<Node>> {
        match pick {
            ReplicaPick::Primary => self.members.primary.clone(),
            ReplicaPick::Secondary => self
                .next_live_secondary(Rotation::Secondary)
                .or_else(|| self.primary_fallback()),
            ReplicaPick::RoundRobin => {
                if self.last_pick_was_primary || self.members.primary.is_none() {
                    if let Some(node) = self.next_live_secondary(Rotation::RoundRobin) {
                        self.last_pick_was_primary = false;
                        return Some(node);
                    }
                }
                self.last_pick_was_primary = true;
                self.members.primary.clone()
            }
        }
    }

    fn primary_fallback(&self) -> Option<Arc<Node>> {
        trace!(group = %self.name(), "no live secondary, falling back to primary");
        self.members.primary.clone()
    }

    /// Circular scan for a live secondary starting at the rotation's cursor.
    ///
    /// Probes each secondary at most once. On success the cursor moves to the
    /// slot after the returned node; on failure it is left where it was.
    fn next_live_secondary(&mut self, rotation: Rotation) -> Option<Arc<Node>> {
        let len = self.members.secondaries.len();
        if len == 0 {
            return None;
        }

        let start = match rotation {
            Rotation::Secondary => self.secondary_cursor,
            Rotation::RoundRobin => self.round_robin_cursor,
        };
        debug_assert!(start < len, "cursor {} outside {} secondaries", start, len);

        // A scan starting at the last slot completes a revolution; the next
        // round-robin call must consider the primary again.
        if rotation == Rotation::RoundRobin && start == len - 1 {
            self.last_pick_was_primary = false;
        }

        let (index, node) = (0..len)
            .map(|step| (start + step) % len)
            .map(|index| (index, &self.members.secondaries[index]))
            .find(|(_, node)| node.is_active())?;
        let node = Arc::clone(node);

        let next = (index + 1) % len;
        match rotation {
            Rotation::Secondary => self.secondary_cursor = next,
            Rotation::RoundRobin => self.round_robin_cursor = next,
        }
        Some(node)
    }
}

impl fmt::Display for ReplicaGroup {
    /// Renders membership as `[primary, secondary, ...]`, with `none` for an
    /// empty primary slot.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        match &self.members.primary {
            Some(primary) => write!(f, "{}", primary)?,
            None => f.write_str("none")?,
        }
        for secondary in &self.members.secondaries {
            write!(f, ", {}", secondary)?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for ReplicaGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaGroup")
            .field("name", &self.name())
            .field("topology", &self.topology.name())
            .field("members", &format_args!("{}", self))
            .field("candidate", &self.members.candidate.as_ref().map(|c| c.to_string()))
            .field("secondary_cursor", &self.secondary_cursor)
            .field("round_robin_cursor", &self.round_robin_cursor)
            .field("last_pick_was_primary", &self.last_pick_was_primary)
            .finish()
    }
}
