//! # Application Errors

use ledgerbook_core::LedgerError;
use thiserror::Error;

/// Errors raised by the CLI around the core: configuration, files, and
/// anything the core itself reports outside a dispatched request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}
