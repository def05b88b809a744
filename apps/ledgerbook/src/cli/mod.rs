//! # ledgerbook CLI Module
//!
//! This module implements the CLI interface for ledgerbook.
//!
//! ## Available Commands
//!
//! - `invoke` - Dispatch one operation with its arguments
//! - `operations` - List the registered operations
//! - `init` - Initialize new database

mod commands;

use crate::{AppError, BackendKind, LedgerConfig};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// ledgerbook - typed records over an append-only ledger
///
/// Saves users and activities, reads them back, runs rich queries and walks
/// the change history of any record.
#[derive(Parser, Debug)]
#[command(name = "ledgerbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ledger database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one operation, e.g. `invoke GetEntity u1`
    Invoke {
        /// Operation name (case-sensitive)
        operation: String,

        /// Operation arguments, passed through untouched
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List the registered operations
    Operations,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

/// Whether the command did what was asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The command ran but the operation answered with a failure.
    Failed,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved configuration.
pub fn execute(
    cli: Cli,
    config: &LedgerConfig,
    out: &mut impl Write,
) -> Result<CommandStatus, AppError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Invoke { operation, args } => {
            cmd_invoke(config, json_mode, &operation, &args, out)
        }
        Commands::Operations => cmd_operations(json_mode, out),
        Commands::Init { force } => cmd_init(config, force, cli.quiet, json_mode, out),
    }
}
