//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Degraded selections (falling back to the primary, or no node at all) are
/// not errors and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A replica group was constructed without a name.
    #[error("replica group must have a non-empty group name")]
    EmptyGroupName,

    /// A secondary was requested by an index past the end of the list.
    #[error("secondary index {index} out of range (group has {len} secondaries)")]
    SecondaryIndexOutOfRange { index: usize, len: usize },

    /// The node's address carries no owning group.
    #[error("node {0} does not belong to a replicated topology")]
    NotReplicated(String),

    /// Address string could not be parsed.
    #[error("invalid node address: {0}")]
    InvalidAddress(String),

    /// Membership change would exceed the group capacity.
    #[error("replica group {group} is full (capacity {capacity})")]
    GroupFull { group: String, capacity: usize },

    /// Node was routed to a group it does not belong to.
    #[error("node belongs to group {found}, not {expected}")]
    GroupMismatch { expected: String, found: String },

    /// Invalid group configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
