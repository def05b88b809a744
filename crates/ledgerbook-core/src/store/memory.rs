//! # In-Memory Ledger
//!
//! Volatile backend for tests and scratch sessions.
//!
//! Cursors re-acquire the read lock for each page rather than holding it, so
//! a long-running query never blocks writers. Rows written behind a cursor's
//! position are not seen; rows written ahead of it may be.

use super::paging::{Page, PageSource, PagedCursor};
use super::{HistoryCursor, LedgerStore, QueryCursor, Selector, ensure_key, transaction_id};
use crate::primitives::QUERY_PAGE_SIZE;
use crate::{HistoryEntry, KvEntry, LedgerError, LedgerTimestamp};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct LedgerState {
    world: BTreeMap<String, Vec<u8>>,
    history: BTreeMap<String, Vec<HistoryEntry>>,
    tx_seq: u64,
}

impl LedgerState {
    fn append(&mut self, key: &str, value: Vec<u8>, is_delete: bool) {
        self.tx_seq += 1;
        let entry = HistoryEntry {
            tx_id: transaction_id(self.tx_seq, key, &value),
            value,
            is_delete,
            timestamp: LedgerTimestamp::now(),
        };
        self.history.entry(key.to_string()).or_default().push(entry);
    }
}

type SharedState = Arc<RwLock<LedgerState>>;

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::StoreRead("ledger state lock poisoned".into())
}

/// In-memory ledger backend.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    state: SharedState,
    rich_query: bool,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// An empty ledger with rich-query support.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            rich_query: true,
        }
    }

    /// An empty ledger that rejects rich queries, like a plain key/value
    /// state database.
    #[must_use]
    pub fn without_rich_query() -> Self {
        Self {
            rich_query: false,
            ..Self::new()
        }
    }

    /// Number of keys currently holding a value.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.state.read().map_err(poisoned)?.world.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

impl LedgerStore for InMemoryLedger {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        ensure_key(key)?;
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::StoreWrite("ledger state lock poisoned".into()))?;
        state.world.insert(key.to_string(), value.to_vec());
        state.append(key, value.to_vec(), false);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, LedgerError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.world.get(key).cloned().unwrap_or_default())
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        ensure_key(key)?;
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::StoreWrite("ledger state lock poisoned".into()))?;
        if state.world.remove(key).is_some() {
            state.append(key, Vec::new(), true);
        }
        Ok(())
    }

    fn query(&self, expression: &str) -> Result<QueryCursor<'_>, LedgerError> {
        if !self.rich_query {
            return Err(LedgerError::QueryUnsupported);
        }
        let selector = Selector::parse(expression)?;
        let limit = selector.limit();
        let source = WorldScan {
            state: Some(Arc::clone(&self.state)),
            selector,
            after: None,
        };
        Ok(Box::new(PagedCursor::new(source).with_limit(limit)))
    }

    fn history(&self, key: &str) -> Result<HistoryCursor<'_>, LedgerError> {
        let source = HistoryScan {
            state: Some(Arc::clone(&self.state)),
            key: key.to_string(),
            next_index: 0,
        };
        Ok(Box::new(PagedCursor::new(source)))
    }
}

// =============================================================================
// CURSOR SOURCES
// =============================================================================

fn released() -> LedgerError {
    LedgerError::StoreRead("cursor source released".into())
}

/// Key-ordered scan of the world state, filtered by a selector.
struct WorldScan {
    state: Option<SharedState>,
    selector: Selector,
    after: Option<String>,
}

impl PageSource for WorldScan {
    type Item = KvEntry;

    fn fetch_page(&mut self) -> Result<Page<KvEntry>, LedgerError> {
        let shared = self.state.as_ref().ok_or_else(released)?;
        let state = shared.read().map_err(poisoned)?;
        let lower = match &self.after {
            Some(after) => Bound::Excluded(after.as_str()),
            None => Bound::Unbounded,
        };

        let mut rows = Vec::new();
        let mut scanned = 0;
        let mut last = None;
        for (key, value) in state
            .world
            .range::<str, _>((lower, Bound::Unbounded))
            .take(QUERY_PAGE_SIZE)
        {
            scanned += 1;
            if self.selector.matches(value) {
                rows.push(KvEntry::new(key.as_str(), value.as_slice()));
            }
            last = Some(key.clone());
        }
        drop(state);

        if last.is_some() {
            self.after = last;
        }
        Ok(Page {
            rows,
            exhausted: scanned < QUERY_PAGE_SIZE,
        })
    }

    fn release(&mut self) {
        self.state = None;
    }
}

/// Oldest-first scan of one key's history.
struct HistoryScan {
    state: Option<SharedState>,
    key: String,
    next_index: usize,
}

impl PageSource for HistoryScan {
    type Item = HistoryEntry;

    fn fetch_page(&mut self) -> Result<Page<HistoryEntry>, LedgerError> {
        let shared = self.state.as_ref().ok_or_else(released)?;
        let state = shared.read().map_err(poisoned)?;
        let entries = state.history.get(&self.key).map_or(&[][..], Vec::as_slice);

        let rows: Vec<HistoryEntry> = entries
            .iter()
            .skip(self.next_index)
            .take(QUERY_PAGE_SIZE)
            .cloned()
            .collect();
        self.next_index += rows.len();
        Ok(Page {
            exhausted: rows.len() < QUERY_PAGE_SIZE,
            rows,
        })
    }

    fn release(&mut self) {
        self.state = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
