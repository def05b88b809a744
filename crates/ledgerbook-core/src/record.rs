//! # Record Codec
//!
//! Typed records and their canonical byte encoding.
//!
//! Every stored record is a compact JSON object whose first field is the
//! `docType` discriminant, followed by `id` and the kind's attributes in
//! declaration order. Attributes that are empty are omitted, whether the
//! client left them out or sent `""`: the two are the same record, and a
//! payload that is already canonical is stored byte-for-byte unchanged.
//!
//! The kind always comes from the caller. `decode` picks the target shape
//! from it before touching the payload, and an unknown kind name is rejected
//! before any parsing happens.

use crate::LedgerError;
use crate::primitives::{DISCRIMINANT_FIELD, IDENTIFIER_FIELD, MAX_PAYLOAD_LENGTH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// RECORD KINDS
// =============================================================================

/// The record kinds this codec can encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    User,
    Activity,
}

impl RecordKind {
    /// Every known kind, in declaration order.
    pub const ALL: [Self; 2] = [Self::User, Self::Activity];

    /// The discriminant value written into `docType`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Activity => "Activity",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordKind {
    type Err = LedgerError;

    /// Exact, case-sensitive match on the discriminant value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| LedgerError::UnknownKind(s.to_string()))
    }
}

// =============================================================================
// ENTITY SHAPES
// =============================================================================

/// Anything stored under its own identifier.
pub trait Entity {
    /// The store key for this record.
    fn id(&self) -> &str;
}

/// A person registered with the program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date_of_registration: String,
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Something that happened on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date_of_activity: String,
}

impl Entity for Activity {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A record of any known kind, tagged by `docType` when encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "docType")]
pub enum Record {
    User(User),
    Activity(Activity),
}

impl Record {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::User(_) => RecordKind::User,
            Self::Activity(_) => RecordKind::Activity,
        }
    }
}

impl Entity for Record {
    fn id(&self) -> &str {
        match self {
            Self::User(user) => user.id(),
            Self::Activity(activity) => activity.id(),
        }
    }
}

impl From<User> for Record {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

impl From<Activity> for Record {
    fn from(activity: Activity) -> Self {
        Self::Activity(activity)
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a record to its canonical bytes.
pub fn encode(record: &Record) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(record).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode `bytes` as a record of `kind`.
///
/// # Errors
///
/// Returns `LedgerError::Decode` if:
/// - the payload exceeds `MAX_PAYLOAD_LENGTH`
/// - the payload is not a JSON object of the kind's shape
/// - the payload declares a different `docType`
/// - the identifier is empty
pub fn decode(kind: RecordKind, bytes: &[u8]) -> Result<Record, LedgerError> {
    if bytes.len() > MAX_PAYLOAD_LENGTH {
        return Err(LedgerError::decode(
            kind.name(),
            format!(
                "payload of {} bytes exceeds maximum {} bytes",
                bytes.len(),
                MAX_PAYLOAD_LENGTH
            ),
        ));
    }

    // Records are JSON objects only, never positional arrays.
    let fields: Map<String, JsonValue> =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::decode(kind.name(), e))?;
    match fields.get(DISCRIMINANT_FIELD) {
        None => {}
        Some(JsonValue::String(declared)) if declared == kind.name() => {}
        Some(declared) => {
            return Err(LedgerError::decode(
                kind.name(),
                format!("{DISCRIMINANT_FIELD} is {declared}, expected {:?}", kind.name()),
            ));
        }
    }

    let object = JsonValue::Object(fields);
    let record = match kind {
        RecordKind::User => serde_json::from_value::<User>(object).map(Record::User),
        RecordKind::Activity => serde_json::from_value::<Activity>(object).map(Record::Activity),
    }
    .map_err(|e| LedgerError::decode(kind.name(), e))?;

    if record.id().is_empty() {
        return Err(LedgerError::decode(
            kind.name(),
            format!("{IDENTIFIER_FIELD} must not be empty"),
        ));
    }

    Ok(record)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> User {
        User {
            id: "u1".into(),
            first_name: "Ana".into(),
            ..User::default()
        }
    }

    #[test]
    fn kind_names_parse_exactly() {
        assert_eq!("User".parse::<RecordKind>().ok(), Some(RecordKind::User));
        assert_eq!(
            "Activity".parse::<RecordKind>().ok(),
            Some(RecordKind::Activity)
        );
        assert!(matches!(
            "user".parse::<RecordKind>(),
            Err(LedgerError::UnknownKind(k)) if k == "user"
        ));
    }

    #[test]
    fn encoding_is_canonical() {
        let bytes = encode(&Record::User(ana())).expect("encode");
        assert_eq!(bytes, br#"{"docType":"User","id":"u1","firstName":"Ana"}"#);
    }

    #[test]
    fn canonical_payload_is_stable() {
        let payload = br#"{"docType":"Activity","id":"a1","dateOfActivity":"2024-01-01"}"#;
        let record = decode(RecordKind::Activity, payload).expect("decode");
        assert_eq!(encode(&record).expect("encode"), payload);
    }

    #[test]
    fn missing_discriminant_is_stamped() {
        let record = decode(RecordKind::User, br#"{"id":"u1","firstName":"Ana"}"#).expect("decode");
        assert_eq!(record.kind(), RecordKind::User);
        let bytes = encode(&record).expect("encode");
        assert!(bytes.starts_with(br#"{"docType":"User""#));
    }

    #[test]
    fn mismatched_discriminant_rejected() {
        let result = decode(RecordKind::User, br#"{"docType":"Activity","id":"x"}"#);
        assert!(matches!(result, Err(LedgerError::Decode { ref kind, .. }) if kind == "User"));
    }

    #[test]
    fn empty_identifier_rejected() {
        let result = decode(RecordKind::Activity, br#"{"id":""}"#);
        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[test]
    fn missing_identifier_rejected() {
        let result = decode(RecordKind::User, br#"{"firstName":"Ana"}"#);
        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[test]
    fn wrong_field_type_rejected() {
        let result = decode(RecordKind::User, br#"{"id":"u1","email":42}"#);
        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[test]
    fn not_json_rejected() {
        let result = decode(RecordKind::User, b"not json");
        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[test]
    fn positional_arrays_rejected() {
        for (kind, payload) in [
            (RecordKind::User, r#"["User"]"#),
            (RecordKind::Activity, r#"["Activity"]"#),
            (RecordKind::User, r#"["u1","Ana"]"#),
        ] {
            let result = decode(kind, payload.as_bytes());
            assert!(
                matches!(result, Err(LedgerError::Decode { .. })),
                "{payload} decoded as {result:?}"
            );
        }
    }

    #[test]
    fn non_string_discriminant_rejected() {
        let result = decode(RecordKind::User, br#"{"docType":7,"id":"u1"}"#);
        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[test]
    fn explicitly_empty_attributes_are_not_stored() {
        let payload = br#"{"docType":"User","id":"u1","firstName":"Ana","lastName":""}"#;
        let record = decode(RecordKind::User, payload).expect("decode");
        assert_eq!(
            encode(&record).expect("encode"),
            br#"{"docType":"User","id":"u1","firstName":"Ana"}"#
        );
    }

    #[test]
    fn oversized_payload_rejected_before_parsing() {
        let payload = vec![b' '; MAX_PAYLOAD_LENGTH + 1];
        let err = decode(RecordKind::User, &payload).expect_err("too large");
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let record =
            decode(RecordKind::Activity, br#"{"id":"a1","venue":"hall"}"#).expect("decode");
        assert_eq!(
            encode(&record).expect("encode"),
            br#"{"docType":"Activity","id":"a1"}"#
        );
    }

    #[test]
    fn entity_id_dispatches_by_kind() {
        let record: Record = Activity {
            id: "a9".into(),
            date_of_activity: String::new(),
        }
        .into();
        assert_eq!(record.id(), "a9");
        assert_eq!(record.kind(), RecordKind::Activity);
    }
}
