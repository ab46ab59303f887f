//! Node abstractions for replicated cache clusters.
//!
//! A [`Node`] is owned by the registry that discovered it and shared with
//! every replica group that references it. Its liveness flag is flipped by
//! an external health checker; groups only ever read it.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator between the fields of a replicated address (`group^role^host:port`).
pub const ADDRESS_SEPARATOR: char = '^';

/// Compact identifier for a node in the cluster.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Role a node was registered with inside its replica group.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ReplicaRole {
    Primary,
    Secondary,
}

impl ReplicaRole {
    fn tag(self) -> &'static str {
        match self {
            ReplicaRole::Primary => "P",
            ReplicaRole::Secondary => "S",
        }
    }
}

impl FromStr for ReplicaRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "P" | "M" => Ok(ReplicaRole::Primary),
            "S" => Ok(ReplicaRole::Secondary),
            other => Err(Error::InvalidAddress(format!("unknown replica role {:?}", other))),
        }
    }
}

/// Network address of a cache node.
///
/// Nodes of a replicated topology carry the name of their group and the role
/// they were announced with; plain nodes carry only an endpoint.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeAddress {
    Plain {
        endpoint: String,
    },
    Replicated {
        group: String,
        role: ReplicaRole,
        endpoint: String,
    },
}

impl NodeAddress {
    pub fn plain(endpoint: impl Into<String>) -> Self {
        NodeAddress::Plain {
            endpoint: endpoint.into(),
        }
    }

    pub fn replicated(group: impl Into<String>, role: ReplicaRole, endpoint: impl Into<String>) -> Self {
        NodeAddress::Replicated {
            group: group.into(),
            role,
            endpoint: endpoint.into(),
        }
    }

    /// `host:port` part of the address.
    pub fn endpoint(&self) -> &str {
        match self {
            NodeAddress::Plain { endpoint } | NodeAddress::Replicated { endpoint, .. } => endpoint,
        }
    }

    /// Owning group, if this is a replicated address.
    pub fn group_name(&self) -> Option<&str> {
        match self {
            NodeAddress::Plain { .. } => None,
            NodeAddress::Replicated { group, .. } => Some(group),
        }
    }

    /// Announced role, if this is a replicated address.
    pub fn role(&self) -> Option<ReplicaRole> {
        match self {
            NodeAddress::Plain { .. } => None,
            NodeAddress::Replicated { role, .. } => Some(*role),
        }
    }
}

fn parse_endpoint(s: &str) -> Result<String> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidAddress(format!("{:?} has no port", s)))?;
    if host.is_empty() {
        return Err(Error::InvalidAddress(format!("{:?} has no host", s)));
    }
    port.parse::<u16>()
        .map_err(|_| Error::InvalidAddress(format!("{:?} has an invalid port", s)))?;
    Ok(s.to_string())
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(ADDRESS_SEPARATOR).collect();
        match parts.as_slice() {
            [endpoint] => Ok(NodeAddress::plain(parse_endpoint(endpoint)?)),
            [group, role, endpoint] => {
                if group.is_empty() {
                    return Err(Error::InvalidAddress(format!("{:?} has an empty group", s)));
                }
                Ok(NodeAddress::replicated(*group, role.parse()?, parse_endpoint(endpoint)?))
            }
            _ => Err(Error::InvalidAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(addr: NodeAddress) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAddress::Plain { endpoint } => f.write_str(endpoint),
            NodeAddress::Replicated { group, role, endpoint } => write!(
                f,
                "{}{sep}{}{sep}{}",
                group,
                role.tag(),
                endpoint,
                sep = ADDRESS_SEPARATOR
            ),
        }
    }
}

/// Cache node as seen by the routing layer.
///
/// Equality is by [`NodeId`]; the liveness flag is not part of identity.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub address: NodeAddress,
    active: AtomicBool,
}

impl Node {
    /// Construct a node that starts out live.
    pub fn new(id: NodeId, address: NodeAddress) -> Self {
        Self {
            id,
            address,
            active: AtomicBool::new(true),
        }
    }

    /// Last liveness value published by the health checker.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address, f)
    }
}

/// Name of the replica group that owns `node`.
///
/// Only nodes of a replicated topology may be passed here; anything else is
/// reported as [`Error::NotReplicated`].
pub fn group_name_of(node: &Node) -> Result<&str> {
    node.address
        .group_name()
        .ok_or_else(|| Error::NotReplicated(node.address.to_string()))
}
