//! # ledgerbook-core
//!
//! Typed record management over an append-only key/value ledger.
//!
//! A caller names an operation and hands over a list of string arguments;
//! the [`Dispatcher`] routes the request to its handler and answers with a
//! [`Response`] envelope. Handlers decode and validate records, talk to the
//! ledger through the [`LedgerStore`] facade, and stream query and history
//! cursors into JSON arrays.
//!
//! ## Layers
//!
//! - `record` - typed records and their canonical JSON bytes
//! - `store` - the ledger facade, in-memory and redb backends, selectors
//! - `cursor` / `json_array` - scoped cursors streamed into JSON arrays
//! - `contract` / `dispatch` - the operations and the name -> handler table
//! - `envelope` - the success/failure result shape
//!
//! ## Constraints
//!
//! - Every fault inside a handler becomes a `Failure`, panics included
//! - Cursors are released exactly once on every exit path
//! - No async, no network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod contract;
pub mod cursor;
pub mod dispatch;
pub mod envelope;
pub mod json_array;
pub mod primitives;
pub mod record;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{HistoryEntry, KvEntry, LedgerError, LedgerTimestamp};

// =============================================================================
// RE-EXPORTS: Records and Dispatch
// =============================================================================

pub use contract::{GET_ENTITY, GET_ENTITY_BY_QUERY, GET_HISTORY_FOR_ENTITY, SAVE_ENTITY};
pub use cursor::{Cursor, ScopedCursor};
pub use dispatch::{Dispatcher, Handler};
pub use envelope::Response;
pub use json_array::{JsonArrayWriter, write_history_array, write_query_array};
pub use record::{Activity, Entity, Record, RecordKind, User, decode, encode};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use store::{
    HistoryCursor, InMemoryLedger, LedgerStore, QueryCursor, RedbLedger, Selector, StoreBackend,
};
