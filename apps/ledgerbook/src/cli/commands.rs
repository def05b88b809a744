//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Payloads and listings go to `out` (stdout in the binary); failure messages
//! in text mode go to stderr.

use super::CommandStatus;
use crate::{AppError, BackendKind, LedgerConfig};
use ledgerbook_core::{Dispatcher, InMemoryLedger, RedbLedger, Response, StoreBackend};
use std::io::Write;

fn write_error(e: std::io::Error) -> AppError {
    AppError::IoError(format!("Cannot write output: {}", e))
}

// =============================================================================
// INVOKE COMMAND
// =============================================================================

/// Dispatch one operation against the configured store and print the result.
pub fn cmd_invoke(
    config: &LedgerConfig,
    json_mode: bool,
    operation: &str,
    args: &[String],
    out: &mut impl Write,
) -> Result<CommandStatus, AppError> {
    let dispatcher = Dispatcher::new(open_store(config)?);
    let response = dispatcher.invoke(operation, args);
    tracing::info!(
        operation,
        success = response.is_success(),
        "operation dispatched"
    );

    if json_mode {
        writeln!(out, "{}", response.to_json()).map_err(write_error)?;
    } else {
        match &response {
            Response::Success(payload) if payload.is_empty() => {}
            Response::Success(payload) => {
                out.write_all(payload).map_err(write_error)?;
                writeln!(out).map_err(write_error)?;
            }
            Response::Failure(message) => eprintln!("{}", message),
        }
    }

    Ok(if response.is_success() {
        CommandStatus::Success
    } else {
        CommandStatus::Failed
    })
}

// =============================================================================
// OPERATIONS COMMAND
// =============================================================================

/// List the operation names the dispatcher accepts.
pub fn cmd_operations(json_mode: bool, out: &mut impl Write) -> Result<CommandStatus, AppError> {
    let dispatcher = Dispatcher::new(InMemoryLedger::new());
    let operations = dispatcher.operations();

    if json_mode {
        let output = serde_json::json!({ "operations": operations });
        writeln!(out, "{}", output).map_err(write_error)?;
    } else {
        for name in operations {
            writeln!(out, "{}", name).map_err(write_error)?;
        }
    }
    Ok(CommandStatus::Success)
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(
    config: &LedgerConfig,
    force: bool,
    quiet: bool,
    json_mode: bool,
    out: &mut impl Write,
) -> Result<CommandStatus, AppError> {
    if config.backend != BackendKind::Redb {
        return Err(AppError::ConfigError(format!(
            "init needs the redb backend, not {}",
            config.backend
        )));
    }

    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(AppError::IoError(format!(
                "Database {:?} already exists. Use --force to overwrite.",
                db_path
            )));
        }
        std::fs::remove_file(db_path).map_err(|e| {
            AppError::IoError(format!("Cannot remove {:?}: {}", db_path, e))
        })?;
        tracing::warn!(path = %db_path.display(), "existing database removed");
    }

    let _ledger = RedbLedger::open(db_path)?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": config.backend.to_string(),
            "initialized": true
        });
        writeln!(out, "{}", output).map_err(write_error)?;
    } else if !quiet {
        writeln!(out, "Initialized new redb database at {:?}", db_path).map_err(write_error)?;
    }
    Ok(CommandStatus::Success)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the store described by `config`.
pub fn open_store(config: &LedgerConfig) -> Result<StoreBackend, AppError> {
    let store: StoreBackend = match config.backend {
        BackendKind::Redb => RedbLedger::open(&config.database)?
            .with_rich_query(config.rich_query)
            .into(),
        BackendKind::Memory => {
            tracing::warn!("memory backend: nothing is kept after this command");
            if config.rich_query {
                InMemoryLedger::new().into()
            } else {
                InMemoryLedger::without_rich_query().into()
            }
        }
    };
    Ok(store)
}
