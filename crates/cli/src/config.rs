//! Command-line arguments.

use clap::Parser;
use tracing::debug;

use crate::commands::Command;

/// Inspect replica-aware node selection for one replica group.
#[derive(Debug, Parser)]
#[command(name = "replica-pick", version, about)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Execute the selected command and print its output to stdout.
    pub fn run(&self) -> anyhow::Result<()> {
        debug!(command = ?self.command, "running command");
        let result = self.command.execute()?;
        print!("{}", result);
        Ok(())
    }
}
