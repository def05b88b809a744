//! # ledgerbook
//!
//! Command-line front end for typed records over an append-only ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                apps/ledgerbook (THE BINARY)              │
//! │                                                          │
//! │   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   │
//! │   │    CLI      │   │    Config    │   │   Logging   │   │
//! │   │   (clap)    │   │ (toml + env) │   │  (tracing)  │   │
//! │   └──────┬──────┘   └──────┬───────┘   └─────────────┘   │
//! │          └────────┬────────┘                             │
//! │                   ▼                                      │
//! │          ┌─────────────────┐                             │
//! │          │ ledgerbook-core │                             │
//! │          │   (THE LOGIC)   │                             │
//! │          └─────────────────┘                             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! ledgerbook init
//! ledgerbook invoke SaveEntity User '{"id":"u1","firstName":"Ana"}'
//! ledgerbook invoke GetEntity u1
//! ledgerbook invoke GetEntityByQuery '{"selector":{"docType":"User"}}'
//! ledgerbook invoke GetHistoryForEntity u1
//! ```

use clap::Parser;
use ledgerbook::cli::{self, CommandStatus};
use ledgerbook::{LedgerConfig, LogFormat};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let resolved = LedgerConfig::resolve(cli.config.as_deref(), cli.database.clone(), cli.backend);
    let config = match resolved {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format, cli.verbose);

    let stdout = std::io::stdout();
    match cli::execute(cli, &config, &mut stdout.lock()) {
        Ok(CommandStatus::Success) => ExitCode::SUCCESS,
        Ok(CommandStatus::Failed) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing on stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "ledgerbook=debug,ledgerbook_core=debug"
    } else {
        "ledgerbook=info,ledgerbook_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
