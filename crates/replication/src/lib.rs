//! Replica groups and replica-aware node selection.
//!
//! This crate provides the routing decision for replicated cache clusters:
//! - Which node of a replica group serves an operation ([`ReplicaPick`])
//! - How membership events are applied to a group ([`GroupTopology`])
//! - A registry of groups for the routing layer ([`GroupRegistry`])

pub mod config;
pub mod group;
pub mod pick;
pub mod registry;
pub mod topology;

pub use config::GroupConfig;
pub use group::{Membership, ReplicaGroup, MAX_GROUP_SIZE, MAX_SECONDARIES};
pub use pick::ReplicaPick;
pub use registry::GroupRegistry;
pub use topology::{GroupTopology, PromotionPolicy, StandardTopology};
