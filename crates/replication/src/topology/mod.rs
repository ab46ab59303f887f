//! Group topology abstractions.
//!
//! A group topology decides how membership events are applied to a replica
//! group. Different topologies can use different promotion policies without
//! touching selection:
//!
//! - **StandardTopology**: role taken from the node's announced address,
//!   prior primary demoted or evicted on role change

pub mod standard;

pub use standard::{PromotionPolicy, StandardTopology};

use corelib::Node;
use std::sync::Arc;

use crate::group::Membership;

/// Trait for group topologies.
///
/// Implementations only rewrite [`Membership`]; the owning
/// [`ReplicaGroup`](crate::ReplicaGroup) clamps its rotation cursors after
/// every change, and `Membership` itself refuses to exceed group capacity.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as one topology is
/// usually shared by every group of a cluster.
pub trait GroupTopology: Send + Sync + 'static {
    /// Insert or update `node` in the slot its role designates.
    ///
    /// # Returns
    /// Whether membership changed
    fn set_node(&self, members: &mut Membership, node: Arc<Node>) -> bool;

    /// Remove `node` from the group.
    ///
    /// # Returns
    /// Whether membership changed
    fn delete_node(&self, members: &mut Membership, node: &Node) -> bool;

    /// Promote the staged candidate to primary.
    ///
    /// # Returns
    /// Whether a role change happened
    fn change_role(&self, members: &mut Membership) -> bool;

    /// Get the topology name (for logging/debugging).
    fn name(&self) -> &'static str;
}
