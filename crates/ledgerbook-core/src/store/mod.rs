//! # Ledger Client Facade
//!
//! The narrow view of the append-only key/value ledger used by every handler.
//!
//! The ledger keeps two things per key:
//! - the current value (world state), which `put` overwrites and `delete` removes
//! - an ordered change history, to which every `put` and `delete` appends
//!   exactly one entry and from which nothing is ever removed
//!
//! ## Backends
//!
//! - `InMemoryLedger` - volatile, for tests and scratch sessions
//! - `RedbLedger` - persistent, ACID, backed by redb
//!
//! `StoreBackend` wraps either one behind the same trait, so callers never
//! need to know which is in use.

pub mod memory;
pub(crate) mod paging;
pub mod redb_ledger;
pub mod selector;

pub use memory::InMemoryLedger;
pub use redb_ledger::RedbLedger;
pub use selector::Selector;

use crate::cursor::Cursor;
use crate::{HistoryEntry, KvEntry, LedgerError};

/// Cursor over the world-state rows matching a rich query, in key order.
pub type QueryCursor<'a> = Box<dyn Cursor<Item = KvEntry> + 'a>;

/// Cursor over the change history of one key, oldest first.
pub type HistoryCursor<'a> = Box<dyn Cursor<Item = HistoryEntry> + 'a>;

/// The ledger operations handlers are allowed to use.
///
/// Keys are non-empty UTF-8 strings. Values are opaque bytes.
pub trait LedgerStore: Send + Sync {
    /// Set the current value of `key` and append a history entry.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), LedgerError>;

    /// Current value of `key`; empty when the key is absent.
    fn get(&self, key: &str) -> Result<Vec<u8>, LedgerError>;

    /// Remove the current value of `key` and append a tombstone.
    ///
    /// Deleting an absent key changes nothing.
    fn delete(&self, key: &str) -> Result<(), LedgerError>;

    /// Open a cursor over the world state matching `expression`.
    ///
    /// # Errors
    ///
    /// `QueryUnsupported` when the backend cannot run rich queries,
    /// `InvalidQuery` when the expression does not parse.
    fn query(&self, expression: &str) -> Result<QueryCursor<'_>, LedgerError>;

    /// Open a cursor over the change history of `key`, oldest first.
    ///
    /// A key that was never written yields an empty cursor.
    fn history(&self, key: &str) -> Result<HistoryCursor<'_>, LedgerError>;
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// The configured storage backend.
#[derive(Debug)]
pub enum StoreBackend {
    /// Volatile storage, lost when the process exits.
    InMemory(InMemoryLedger),
    /// redb file on disk.
    Persistent(RedbLedger),
}

impl StoreBackend {
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn inner(&self) -> &dyn LedgerStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

impl LedgerStore for StoreBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        self.inner().put(key, value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, LedgerError> {
        self.inner().get(key)
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        self.inner().delete(key)
    }

    fn query(&self, expression: &str) -> Result<QueryCursor<'_>, LedgerError> {
        self.inner().query(expression)
    }

    fn history(&self, key: &str) -> Result<HistoryCursor<'_>, LedgerError> {
        self.inner().history(key)
    }
}

impl From<InMemoryLedger> for StoreBackend {
    fn from(store: InMemoryLedger) -> Self {
        Self::InMemory(store)
    }
}

impl From<RedbLedger> for StoreBackend {
    fn from(store: RedbLedger) -> Self {
        Self::Persistent(store)
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Transaction id of the `seq`-th mutation: BLAKE3 over the sequence number,
/// the key and the written bytes, as lowercase hex.
pub(crate) fn transaction_id(seq: u64, key: &str, value: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seq.to_be_bytes());
    hasher.update(&(key.len() as u64).to_be_bytes());
    hasher.update(key.as_bytes());
    hasher.update(value);
    hasher.finalize().to_hex().to_string()
}

pub(crate) fn ensure_key(key: &str) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(LedgerError::StoreWrite("key must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_ids_are_distinct_per_mutation() {
        let a = transaction_id(1, "u1", b"{}");
        let b = transaction_id(2, "u1", b"{}");
        let c = transaction_id(1, "u2", b"{}");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, transaction_id(1, "u1", b"{}"));
    }

    #[test]
    fn key_length_prefix_separates_key_from_value() {
        assert_ne!(transaction_id(1, "ab", b"c"), transaction_id(1, "a", b"bc"));
    }

    #[test]
    fn backend_enum_delegates() {
        let backend = StoreBackend::from(InMemoryLedger::new());
        assert!(!backend.is_persistent());
        backend.put("k", b"v").expect("put");
        assert_eq!(backend.get("k").expect("get"), b"v");
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(ensure_key(""), Err(LedgerError::StoreWrite(_))));
        assert!(ensure_key("k").is_ok());
    }
}
