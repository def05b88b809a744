//! # Core Type Definitions
//!
//! The values that cross the store boundary and the error taxonomy shared by
//! every layer:
//! - Store rows (`KvEntry`, `HistoryEntry`)
//! - Backend timestamps (`LedgerTimestamp`)
//! - Error types (`LedgerError`)

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

// =============================================================================
// STORE ROWS
// =============================================================================

/// One world-state row yielded by a rich-query cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The store key (the record identifier).
    pub key: String,
    /// The stored bytes, expected to be a JSON document.
    pub value: Vec<u8>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One immutable fact in the change history of a key.
///
/// Every `put` and `delete` applied to a key appends exactly one entry.
/// Tombstones (`is_delete == true`) carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Transaction id of the mutation.
    pub tx_id: String,
    /// Value written by the mutation (empty for tombstones).
    pub value: Vec<u8>,
    /// Whether this mutation deleted the key.
    pub is_delete: bool,
    /// When the mutation was applied.
    pub timestamp: LedgerTimestamp,
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// A backend timestamp: seconds and nanoseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct LedgerTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl LedgerTimestamp {
    #[must_use]
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Current wall-clock time. Clocks set before 1970 read as the epoch.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos() as i32,
        }
    }
}

/// Human-readable UTC rendering, e.g. `2024-03-01 12:30:00.25 +0000 UTC`.
///
/// The fractional second keeps only its significant digits and is omitted
/// when zero. Timestamps chrono cannot represent fall back to
/// `<secs>.<nanos>s`.
impl fmt::Display for LedgerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parsed = u32::try_from(self.nanos)
            .ok()
            .and_then(|n| Some((DateTime::from_timestamp(self.seconds, n)?, n)));
        let Some((dt, n)) = parsed else {
            return write!(f, "{}.{:09}s", self.seconds, self.nanos);
        };

        write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))?;
        let fraction = n % 1_000_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:09}");
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        f.write_str(" +0000 UTC")
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur anywhere in the ledgerbook core.
///
/// - No silent failures
/// - The dispatcher turns every variant into a `Failure` envelope whose
///   message is the `Display` text below
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A handler received the wrong number of arguments.
    #[error("Incorrect number of arguments. Expecting {expected}, got {got}")]
    Arity { expected: usize, got: usize },

    /// No handler is registered under the requested name.
    #[error("Invalid operation name: {0}")]
    UnknownOperation(String),

    /// The requested record kind is not one the codec knows.
    #[error("Unknown record kind: {0}")]
    UnknownKind(String),

    /// The payload does not match the shape of the declared kind.
    #[error("Cannot decode {kind} payload: {detail}")]
    Decode { kind: String, detail: String },

    /// The backend failed to apply a write.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// The backend failed to serve a read.
    #[error("Store read failed: {0}")]
    StoreRead(String),

    /// The backend has no rich-query support.
    #[error("Rich queries are not supported by this store")]
    QueryUnsupported,

    /// The rich-query expression is malformed.
    #[error("Invalid query expression: {0}")]
    InvalidQuery(String),

    /// Encoding a value for storage or output failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub(crate) fn decode(kind: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::Decode {
            kind: kind.into(),
            detail: detail.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
