//! # ledgerbook
//!
//! Command-line front end for `ledgerbook-core`: configuration loading,
//! store selection, and one dispatched request per run.

pub mod cli;
pub mod config;
pub mod error;

pub use config::{BackendKind, LedgerConfig, LogFormat};
pub use error::AppError;
