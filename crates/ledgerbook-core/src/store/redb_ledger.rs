//! # redb-backed Ledger
//!
//! A persistent ledger on the redb embedded database.
//!
//! - ACID transactions: a mutation updates the world state, the history and
//!   the transaction counter in one commit
//! - Crash safety (copy-on-write B-trees)
//! - MVCC: each cursor reads from its own snapshot, so concurrent writes never
//!   tear a query or history result
//!
//! ## Tables
//!
//! | table         | key              | value                    |
//! |---------------|------------------|--------------------------|
//! | `world_state` | record key       | current bytes            |
//! | `history`     | (record key, tx) | postcard `HistoryEntry`  |
//! | `metadata`    | name             | u64 counter              |
//!
//! History rows are keyed by the global transaction sequence, which is
//! strictly increasing, so a per-key range scan is already oldest first.

use super::paging::{Page, PageSource, PagedCursor};
use super::{HistoryCursor, LedgerStore, QueryCursor, Selector, ensure_key, transaction_id};
use crate::primitives::QUERY_PAGE_SIZE;
use crate::{HistoryEntry, KvEntry, LedgerError, LedgerTimestamp};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use std::fmt::Display;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

/// Current value per key.
const WORLD_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("world_state");

/// Change history: (key, tx_seq) -> serialized HistoryEntry.
const HISTORY: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("history");

/// Counters: name -> u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const TX_SEQ: &str = "tx_seq";

fn read_error(e: impl Display) -> LedgerError {
    LedgerError::StoreRead(e.to_string())
}

fn write_error(e: impl Display) -> LedgerError {
    LedgerError::StoreWrite(e.to_string())
}

/// A disk-backed ledger store using redb.
pub struct RedbLedger {
    db: Arc<Database>,
    rich_query: bool,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger")
            .field("rich_query", &self.rich_query)
            .finish_non_exhaustive()
    }
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = Database::create(path.as_ref()).map_err(write_error)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(write_error)?;
        let _ = write_txn.open_table(WORLD_STATE).map_err(write_error)?;
        let _ = write_txn.open_table(HISTORY).map_err(write_error)?;
        let _ = write_txn.open_table(METADATA).map_err(write_error)?;
        write_txn.commit().map_err(write_error)?;

        tracing::debug!(path = %path.as_ref().display(), "ledger database opened");
        Ok(Self {
            db: Arc::new(db),
            rich_query: true,
        })
    }

    /// Turn rich-query support on or off for this handle.
    #[must_use]
    pub fn with_rich_query(mut self, enabled: bool) -> Self {
        self.rich_query = enabled;
        self
    }

    /// Number of keys currently holding a value.
    pub fn len(&self) -> Result<u64, LedgerError> {
        let read_txn = self.db.begin_read().map_err(read_error)?;
        let table = read_txn.open_table(WORLD_STATE).map_err(read_error)?;
        table.len().map_err(read_error)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Number of mutations applied since the database was created.
    pub fn transaction_count(&self) -> Result<u64, LedgerError> {
        let read_txn = self.db.begin_read().map_err(read_error)?;
        let table = read_txn.open_table(METADATA).map_err(read_error)?;
        let count = table
            .get(TX_SEQ)
            .map_err(read_error)?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(count)
    }

    /// Bump the transaction counter inside `txn` and record the history row.
    fn append_history(
        txn: &WriteTransaction,
        key: &str,
        value: &[u8],
        is_delete: bool,
    ) -> Result<(), LedgerError> {
        let mut metadata = txn.open_table(METADATA).map_err(write_error)?;
        let seq = metadata
            .get(TX_SEQ)
            .map_err(write_error)?
            .map(|v| v.value())
            .unwrap_or(0)
            + 1;
        metadata.insert(TX_SEQ, seq).map_err(write_error)?;

        let entry = HistoryEntry {
            tx_id: transaction_id(seq, key, value),
            value: value.to_vec(),
            is_delete,
            timestamp: LedgerTimestamp::now(),
        };
        let row = postcard::to_allocvec(&entry)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut history = txn.open_table(HISTORY).map_err(write_error)?;
        history
            .insert((key, seq), row.as_slice())
            .map_err(write_error)?;
        Ok(())
    }
}

impl LedgerStore for RedbLedger {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        ensure_key(key)?;
        let write_txn = self.db.begin_write().map_err(write_error)?;
        {
            let mut world = write_txn.open_table(WORLD_STATE).map_err(write_error)?;
            world.insert(key, value).map_err(write_error)?;
        }
        Self::append_history(&write_txn, key, value, false)?;
        write_txn.commit().map_err(write_error)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(read_error)?;
        let table = read_txn.open_table(WORLD_STATE).map_err(read_error)?;
        let value = table
            .get(key)
            .map_err(read_error)?
            .map(|v| v.value().to_vec())
            .unwrap_or_default();
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        ensure_key(key)?;
        let write_txn = self.db.begin_write().map_err(write_error)?;
        let existed = {
            let mut world = write_txn.open_table(WORLD_STATE).map_err(write_error)?;
            world.remove(key).map_err(write_error)?.is_some()
        };
        if !existed {
            write_txn.abort().map_err(write_error)?;
            return Ok(());
        }
        Self::append_history(&write_txn, key, &[], true)?;
        write_txn.commit().map_err(write_error)?;
        Ok(())
    }

    fn query(&self, expression: &str) -> Result<QueryCursor<'_>, LedgerError> {
        if !self.rich_query {
            return Err(LedgerError::QueryUnsupported);
        }
        let selector = Selector::parse(expression)?;
        let limit = selector.limit();
        let source = WorldScan {
            txn: Some(self.db.begin_read().map_err(read_error)?),
            selector,
            after: None,
        };
        Ok(Box::new(PagedCursor::new(source).with_limit(limit)))
    }

    fn history(&self, key: &str) -> Result<HistoryCursor<'_>, LedgerError> {
        let source = HistoryScan {
            txn: Some(self.db.begin_read().map_err(read_error)?),
            key: key.to_string(),
            next_seq: 0,
            done: false,
        };
        Ok(Box::new(PagedCursor::new(source)))
    }
}

// =============================================================================
// CURSOR SOURCES
// =============================================================================

fn released() -> LedgerError {
    LedgerError::StoreRead("cursor snapshot released".into())
}

/// Key-ordered scan of the world state inside one read snapshot.
struct WorldScan {
    txn: Option<ReadTransaction>,
    selector: Selector,
    after: Option<String>,
}

impl PageSource for WorldScan {
    type Item = KvEntry;

    fn fetch_page(&mut self) -> Result<Page<KvEntry>, LedgerError> {
        let txn = self.txn.as_ref().ok_or_else(released)?;
        let table = txn.open_table(WORLD_STATE).map_err(read_error)?;
        let after = self.after.clone();
        let lower = match after.as_deref() {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        let mut rows = Vec::new();
        let mut scanned = 0;
        let mut last = None;
        for row in table
            .range::<&str>((lower, Bound::Unbounded))
            .map_err(read_error)?
            .take(QUERY_PAGE_SIZE)
        {
            let (key, value) = row.map_err(read_error)?;
            scanned += 1;
            if self.selector.matches(value.value()) {
                rows.push(KvEntry::new(key.value(), value.value()));
            }
            last = Some(key.value().to_string());
        }

        if last.is_some() {
            self.after = last;
        }
        Ok(Page {
            rows,
            exhausted: scanned < QUERY_PAGE_SIZE,
        })
    }

    fn release(&mut self) {
        self.txn = None;
    }
}

/// Oldest-first scan of one key's history inside one read snapshot.
struct HistoryScan {
    txn: Option<ReadTransaction>,
    key: String,
    next_seq: u64,
    done: bool,
}

impl PageSource for HistoryScan {
    type Item = HistoryEntry;

    fn fetch_page(&mut self) -> Result<Page<HistoryEntry>, LedgerError> {
        if self.done {
            return Ok(Page {
                rows: Vec::new(),
                exhausted: true,
            });
        }
        let txn = self.txn.as_ref().ok_or_else(released)?;
        let table = txn.open_table(HISTORY).map_err(read_error)?;

        let mut rows = Vec::new();
        let mut last_seq = None;
        for row in table
            .range((self.key.as_str(), self.next_seq)..=(self.key.as_str(), u64::MAX))
            .map_err(read_error)?
            .take(QUERY_PAGE_SIZE)
        {
            let (key, value) = row.map_err(read_error)?;
            let entry: HistoryEntry = postcard::from_bytes(value.value())
                .map_err(|e| LedgerError::StoreRead(format!("corrupt history row: {e}")))?;
            rows.push(entry);
            last_seq = Some(key.value().1);
        }

        let exhausted = rows.len() < QUERY_PAGE_SIZE;
        match last_seq.and_then(|seq| seq.checked_add(1)) {
            Some(next) => self.next_seq = next,
            None => self.done = last_seq.is_some(),
        }
        self.done |= exhausted;
        Ok(Page { rows, exhausted })
    }

    fn release(&mut self) {
        self.txn = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
