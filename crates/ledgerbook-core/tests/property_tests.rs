//! # Property-Based Tests
//!
//! Codec round-trips, arity enforcement and array well-formedness under
//! generated input.

use ledgerbook_core::{
    Activity, Dispatcher, InMemoryLedger, KvEntry, Record, RecordKind, User, decode, encode,
    write_query_array,
};
use ledgerbook_core::{Cursor, LedgerError};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn text() -> impl Strategy<Value = String> {
    "[ -~]{0,24}"
}

fn identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,16}"
}

prop_compose! {
    fn user()(
        id in identifier(),
        first_name in text(),
        last_name in text(),
        email in text(),
        phone_number in text(),
        user_type in text(),
        date_of_registration in text(),
    ) -> User {
        User { id, first_name, last_name, email, phone_number, user_type, date_of_registration }
    }
}

prop_compose! {
    fn activity()(id in identifier(), date_of_activity in text()) -> Activity {
        Activity { id, date_of_activity }
    }
}

fn record() -> impl Strategy<Value = Record> {
    prop_oneof![user().prop_map(Record::User), activity().prop_map(Record::Activity)]
}

/// Cursor over an in-memory list, for driving the array writer directly.
struct ListCursor(std::vec::IntoIter<KvEntry>);

impl Cursor for ListCursor {
    type Item = KvEntry;

    fn advance(&mut self) -> Result<Option<KvEntry>, LedgerError> {
        Ok(self.0.next())
    }

    fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Decoding an encoded record yields the same record.
    #[test]
    fn codec_round_trip(record in record()) {
        let bytes = encode(&record).expect("encode");
        let back = decode(record.kind(), &bytes).expect("decode");
        prop_assert_eq!(back, record);
    }

    /// Encoded bytes are already canonical: re-encoding changes nothing.
    #[test]
    fn encoding_is_a_fixed_point(record in record()) {
        let bytes = encode(&record).expect("encode");
        let again = encode(&decode(record.kind(), &bytes).expect("decode")).expect("encode");
        prop_assert_eq!(again, bytes);
    }

    /// A payload never decodes as the other kind once it declares its own.
    #[test]
    fn discriminant_mismatch_rejected(record in record()) {
        let bytes = encode(&record).expect("encode");
        let other = match record.kind() {
            RecordKind::User => RecordKind::Activity,
            RecordKind::Activity => RecordKind::User,
        };
        let is_decode_error = matches!(decode(other, &bytes), Err(LedgerError::Decode { .. }));
        prop_assert!(is_decode_error);
    }

    /// Any wrong argument count fails and names the expected count.
    #[test]
    fn arity_always_reported(
        operation in prop::sample::select(vec![
            ("SaveEntity", 2usize),
            ("GetEntity", 1),
            ("GetEntityByQuery", 1),
            ("GetHistoryForEntity", 1),
        ]),
        argv in vec(text(), 0..6),
    ) {
        let (name, expected) = operation;
        prop_assume!(argv.len() != expected);
        let dispatcher = Dispatcher::new(InMemoryLedger::new());
        let response = dispatcher.invoke(name, &argv);
        let message = response.message().expect("failure");
        let expecting = format!("Expecting {expected}");
        prop_assert!(message.contains(&expecting));
    }

    /// Saved records read back as their canonical bytes.
    #[test]
    fn save_then_get_returns_canonical_bytes(record in record()) {
        let dispatcher = Dispatcher::new(InMemoryLedger::new());
        let json = String::from_utf8(encode(&record).expect("encode")).expect("utf8");
        let argv = vec![record.kind().name().to_string(), json.clone()];
        prop_assert!(dispatcher.invoke("SaveEntity", &argv).is_success());

        let id = match &record {
            Record::User(user) => user.id.clone(),
            Record::Activity(activity) => activity.id.clone(),
        };
        let fetched = dispatcher.invoke("GetEntity", &[id]);
        prop_assert_eq!(fetched.payload(), Some(json.as_bytes()));
    }

    /// Query arrays parse as JSON with one element per row, keys preserved.
    #[test]
    fn query_array_is_well_formed(keys in vec("[ -~]{1,12}", 0..20)) {
        let entries: Vec<KvEntry> = keys
            .iter()
            .map(|k| KvEntry::new(k.as_str(), br#"{"n":1}"#.to_vec()))
            .collect();
        let bytes = write_query_array(ListCursor(entries.into_iter()), Vec::new()).expect("stream");
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        let items = parsed.as_array().expect("array");
        prop_assert_eq!(items.len(), keys.len());
        for (item, key) in items.iter().zip(&keys) {
            prop_assert_eq!(item["Key"].as_str(), Some(key.as_str()));
        }
    }
}
