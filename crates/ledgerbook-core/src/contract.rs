//! # Entity Operations
//!
//! The handlers behind the four built-in operations:
//!
//! | operation             | arguments        | payload on success             |
//! |-----------------------|------------------|--------------------------------|
//! | `SaveEntity`          | kind, JSON       | empty                          |
//! | `GetEntity`           | key              | stored bytes (empty if absent) |
//! | `GetEntityByQuery`    | query expression | JSON array of `{Key, Record}`  |
//! | `GetHistoryForEntity` | key              | JSON array of history entries  |
//!
//! Every handler checks its own argument count first and touches the store
//! only once the arguments are valid.

use crate::json_array::{write_history_array, write_query_array};
use crate::record::{self, Entity, RecordKind};
use crate::store::LedgerStore;
use crate::LedgerError;

pub const SAVE_ENTITY: &str = "SaveEntity";
pub const GET_ENTITY: &str = "GetEntity";
pub const GET_ENTITY_BY_QUERY: &str = "GetEntityByQuery";
pub const GET_HISTORY_FOR_ENTITY: &str = "GetHistoryForEntity";

/// Fail with `Arity` unless exactly `expected` arguments were given.
pub fn expect_args(args: &[String], expected: usize) -> Result<(), LedgerError> {
    if args.len() != expected {
        return Err(LedgerError::Arity {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// `SaveEntity(kind, json)`: decode as `kind`, store the canonical encoding
/// under the record's id.
pub fn save_entity<S: LedgerStore + ?Sized>(
    store: &S,
    args: &[String],
) -> Result<Vec<u8>, LedgerError> {
    expect_args(args, 2)?;
    let kind: RecordKind = args[0].parse()?;
    let record = record::decode(kind, args[1].as_bytes())?;
    let bytes = record::encode(&record)?;
    store.put(record.id(), &bytes)?;
    tracing::debug!(kind = %kind, id = record.id(), bytes = bytes.len(), "entity saved");
    Ok(Vec::new())
}

/// `GetEntity(key)`: the stored bytes, verbatim.
pub fn get_entity<S: LedgerStore + ?Sized>(
    store: &S,
    args: &[String],
) -> Result<Vec<u8>, LedgerError> {
    expect_args(args, 1)?;
    store.get(&args[0])
}

/// `GetEntityByQuery(expression)`
pub fn get_entity_by_query<S: LedgerStore + ?Sized>(
    store: &S,
    args: &[String],
) -> Result<Vec<u8>, LedgerError> {
    expect_args(args, 1)?;
    let cursor = store.query(&args[0])?;
    write_query_array(cursor, Vec::new())
}

/// `GetHistoryForEntity(key)`
pub fn get_history_for_entity<S: LedgerStore + ?Sized>(
    store: &S,
    args: &[String],
) -> Result<Vec<u8>, LedgerError> {
    expect_args(args, 1)?;
    let cursor = store.history(&args[0])?;
    write_history_array(cursor, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedger;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn save_stores_canonical_bytes_under_id() {
        let store = InMemoryLedger::new();
        let payload = save_entity(&store, &args(&["User", r#"{"firstName":"Ana","id":"u1"}"#]))
            .expect("save");
        assert!(payload.is_empty());
        assert_eq!(
            store.get("u1").expect("get"),
            br#"{"docType":"User","id":"u1","firstName":"Ana"}"#
        );
    }

    #[test]
    fn save_rejects_unknown_kind_without_writing() {
        let store = InMemoryLedger::new();
        let err = save_entity(&store, &args(&["Invoice", r#"{"id":"i1"}"#])).expect_err("kind");
        assert!(matches!(err, LedgerError::UnknownKind(ref k) if k == "Invoice"));
        assert!(store.is_empty().expect("len"));
    }

    #[test]
    fn save_rejects_bad_payload_without_writing() {
        let store = InMemoryLedger::new();
        let err = save_entity(&store, &args(&["Activity", "{"])).expect_err("decode");
        assert!(matches!(err, LedgerError::Decode { .. }));
        assert!(store.is_empty().expect("len"));
    }

    #[test]
    fn arity_checked_before_store_access() {
        let store = InMemoryLedger::without_rich_query();
        let err = get_entity_by_query(&store, &[]).expect_err("arity");
        assert!(matches!(err, LedgerError::Arity { expected: 1, got: 0 }));
        let err = save_entity(&store, &args(&["User"])).expect_err("arity");
        assert_eq!(err.to_string(), "Incorrect number of arguments. Expecting 2, got 1");
    }

    #[test]
    fn query_and_history_produce_arrays() {
        let store = InMemoryLedger::new();
        save_entity(&store, &args(&["User", r#"{"id":"u1"}"#])).expect("save");
        let query = get_entity_by_query(&store, &args(&[r#"{"selector":{"id":"u1"}}"#]))
            .expect("query");
        assert_eq!(
            query,
            br#"[{"Key":"u1", "Record":{"docType":"User","id":"u1"}}]"#
        );
        let history = get_history_for_entity(&store, &args(&["u1"])).expect("history");
        let parsed: serde_json::Value = serde_json::from_slice(&history).expect("json");
        assert_eq!(parsed[0]["Value"]["id"], "u1");
        assert_eq!(parsed[0]["IsDelete"], "false");
    }
}
