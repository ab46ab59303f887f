//! Core library for replicated cache clusters.
//!
//! This crate provides the shared vocabulary used by replica groups and the
//! routing layer above them:
//! - Node identity, addresses and the externally maintained liveness flag
//! - Replicated address parsing (`group^role^host:port`)
//! - The common error type

pub mod error;
pub mod node;

pub use error::{Error, Result};
pub use node::{group_name_of, Node, NodeAddress, NodeId, ReplicaRole};
