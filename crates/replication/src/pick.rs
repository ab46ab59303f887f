//! Caller-facing pick modes.

use std::fmt;
use std::str::FromStr;

use corelib::Error;
use serde::{Deserialize, Serialize};

/// How a replica group should choose the node for one operation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaPick {
    /// Must hit the primary (writes, consistency-sensitive reads).
    Primary,
    /// Prefer a live secondary, fall back to the primary.
    Secondary,
    /// Alternate between the primary and the live secondaries.
    RoundRobin,
}

impl ReplicaPick {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplicaPick::Primary => "primary",
            ReplicaPick::Secondary => "secondary",
            ReplicaPick::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for ReplicaPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicaPick {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(ReplicaPick::Primary),
            "secondary" | "slave" => Ok(ReplicaPick::Secondary),
            "rr" | "round_robin" | "round-robin" => Ok(ReplicaPick::RoundRobin),
            _ => Err(Error::Config(format!("unknown replica pick {:?}", s))),
        }
    }
}
