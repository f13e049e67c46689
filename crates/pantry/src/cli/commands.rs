//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::controller::RemoveMode;

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Item name
    pub name: String,

    /// How many to add (defaults to 1)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub quantity: Option<i64>,
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Item name
    pub name: String,

    /// New quantity
    #[arg(allow_negative_numbers = true)]
    pub quantity: i64,
}

/// Remove command arguments.
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Item name
    pub name: String,

    /// Removal mode (defaults to the configured mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<RemoveModeArg>,
}

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Removal mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RemoveModeArg {
    /// Delete the item outright
    Hard,
    /// Take one away, deleting the item at zero
    Decrement,
}

impl From<RemoveModeArg> for RemoveMode {
    fn from(arg: RemoveModeArg) -> Self {
        match arg {
            RemoveModeArg::Hard => Self::Hard,
            RemoveModeArg::Decrement => Self::Decrement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_mode_arg_conversion() {
        assert_eq!(RemoveMode::from(RemoveModeArg::Hard), RemoveMode::Hard);
        assert_eq!(
            RemoveMode::from(RemoveModeArg::Decrement),
            RemoveMode::Decrement
        );
    }

    #[test]
    fn test_add_command_debug() {
        let cmd = AddCommand {
            name: "flour".to_string(),
            quantity: Some(2),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("flour"));
        assert!(debug_str.contains("quantity"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_remove_mode_arg_debug() {
        assert_eq!(format!("{:?}", RemoveModeArg::Decrement), "Decrement");
    }
}
