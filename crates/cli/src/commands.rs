//! CLI subcommands.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Subcommand;
use corelib::NodeAddress;
use replication::{GroupConfig, ReplicaGroup, ReplicaPick};
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the group's membership.
    Show {
        /// Group configuration (JSON).
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the nodes a pick mode selects over repeated calls.
    Pick {
        #[arg(long)]
        config: PathBuf,
        /// primary, secondary or rr.
        #[arg(long, default_value = "rr")]
        mode: ReplicaPick,
        #[arg(long, default_value_t = 6)]
        count: usize,
        /// Mark a node down before picking (repeatable).
        #[arg(long)]
        down: Vec<NodeAddress>,
    },
    /// Stage a candidate, run a role change and print the group before and after.
    Failover {
        #[arg(long)]
        config: PathBuf,
        /// Address of the node to promote.
        #[arg(long)]
        candidate: NodeAddress,
    },
}

/// Output lines of a command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub lines: Vec<String>,
}

impl CommandResult {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn load_group(path: &Path) -> anyhow::Result<ReplicaGroup> {
    let config = GroupConfig::load(path)?;
    let group = ReplicaGroup::from_config(&config)
        .with_context(|| format!("building group from {}", path.display()))?;
    info!(group = %group.name(), topology = group.topology().name(), "group loaded");
    Ok(group)
}

impl Command {
    pub fn execute(&self) -> anyhow::Result<CommandResult> {
        match self {
            Command::Show { config } => Ok(show(&load_group(config)?)),
            Command::Pick {
                config,
                mode,
                count,
                down,
            } => {
                let mut group = load_group(config)?;
                mark_down(&group, down)?;
                Ok(pick_sequence(&mut group, *mode, *count))
            }
            Command::Failover { config, candidate } => {
                let mut group = load_group(config)?;
                failover(&mut group, candidate)
            }
        }
    }
}

/// Describe membership, candidate and liveness of every node.
pub fn show(group: &ReplicaGroup) -> CommandResult {
    let mut out = CommandResult::default();
    out.push(format!("group {} {}", group.name(), group));
    if let Some(primary) = group.primary() {
        out.push(format!("  primary    {} active={}", primary, primary.is_active()));
    }
    for (i, secondary) in group.secondaries().iter().enumerate() {
        out.push(format!("  secondary{} {} active={}", i, secondary, secondary.is_active()));
    }
    if let Some(candidate) = group.primary_candidate() {
        out.push(format!("  candidate  {}", candidate));
    }
    out
}

fn mark_down(group: &ReplicaGroup, down: &[NodeAddress]) -> anyhow::Result<()> {
    for addr in down {
        let node = group
            .primary()
            .into_iter()
            .chain(group.secondaries())
            .find(|n| n.address == *addr)
            .ok_or_else(|| anyhow!("{} is not a member of {}", addr, group.name()))?;
        node.set_active(false);
    }
    Ok(())
}

/// Select `count` times with `mode`, one line per pick.
pub fn pick_sequence(group: &mut ReplicaGroup, mode: ReplicaPick, count: usize) -> CommandResult {
    let mut out = CommandResult::default();
    for i in 0..count {
        match group.select(mode) {
            Some(node) => out.push(format!("{:>3} {}", i + 1, node)),
            None => out.push(format!("{:>3} <no node available>", i + 1)),
        }
    }
    out
}

/// Promote the member at `candidate` and show the group before and after.
pub fn failover(group: &mut ReplicaGroup, candidate: &NodeAddress) -> anyhow::Result<CommandResult> {
    let node = group
        .secondaries()
        .iter()
        .find(|n| n.address == *candidate)
        .cloned()
        .ok_or_else(|| anyhow!("{} is not a secondary of {}", candidate, group.name()))?;

    let mut out = CommandResult::default();
    out.push(format!("before {}", group));
    group.set_primary_candidate(Some(node));
    let changed = group.change_role();
    out.push(format!("after  {} (role change: {})", group, changed));
    Ok(out)
}
