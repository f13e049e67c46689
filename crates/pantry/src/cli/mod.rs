//! Command-line interface for pantry.
//!
//! This module provides the CLI structure for the `pantry` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, ListCommand, RemoveCommand, RemoveModeArg, ServeCommand,
    UpdateCommand,
};

/// pantry - Keep track of what's in your kitchen
///
/// Records pantry items and their quantities, and asks a language model for
/// recipes that use them.
#[derive(Debug, Parser)]
#[command(name = "pantry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List everything in the pantry
    List(ListCommand),

    /// Add an item, or more of an existing one
    Add(AddCommand),

    /// Set an item's quantity
    Update(UpdateCommand),

    /// Remove an item
    Remove(RemoveCommand),

    /// Suggest a recipe from the current pantry
    Recipe,

    /// Run the recipe suggestion HTTP endpoint
    Serve(ServeCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
