//! CLI tool for inspecting replica group routing.
//!
//! Provides commands for:
//! - Showing a group loaded from its JSON configuration
//! - Printing the node sequence a pick mode produces
//! - Simulating a role change

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
