//! # Rich-Query Selectors
//!
//! A subset of the CouchDB/Mango query language, evaluated against stored
//! JSON documents:
//!
//! ```json
//! {"selector": {"docType": "User", "age": {"$gte": 18}}, "limit": 10}
//! ```
//!
//! Field paths may be dot-separated (`"address.city"`). A field maps either
//! to a literal (equality) or to an object of operators: `$eq`, `$ne`, `$gt`,
//! `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`. All conditions must hold.
//! Apart from `{"$exists": false}`, no operator matches a missing field.

use crate::LedgerError;
use crate::primitives::MAX_QUERY_LIMIT;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;

/// A parsed rich-query expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    conditions: Vec<FieldCondition>,
    limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
struct FieldCondition {
    path: Vec<String>,
    ops: Vec<Op>,
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Eq(JsonValue),
    Ne(JsonValue),
    Gt(JsonValue),
    Gte(JsonValue),
    Lt(JsonValue),
    Lte(JsonValue),
    In(Vec<JsonValue>),
    Nin(Vec<JsonValue>),
    Exists(bool),
}

fn invalid(detail: impl Into<String>) -> LedgerError {
    LedgerError::InvalidQuery(detail.into())
}

impl Selector {
    /// Parse a query expression.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidQuery` when the expression is not a JSON
    /// object with a `selector` object, uses an unsupported operator or
    /// combinator, asks for `sort`, or carries a non-integer `limit`.
    pub fn parse(expression: &str) -> Result<Self, LedgerError> {
        let root: JsonValue =
            serde_json::from_str(expression).map_err(|e| invalid(format!("not JSON: {e}")))?;
        let JsonValue::Object(root) = root else {
            return Err(invalid("expression must be a JSON object"));
        };

        let selector = match root.get("selector") {
            Some(JsonValue::Object(selector)) => selector,
            Some(_) => return Err(invalid("selector must be an object")),
            None => return Err(invalid("missing selector")),
        };

        if root.contains_key("sort") {
            return Err(invalid("sort is not supported; results are in key order"));
        }

        let limit = match root.get("limit") {
            None | Some(JsonValue::Null) => None,
            Some(value) => {
                let limit = value
                    .as_u64()
                    .ok_or_else(|| invalid("limit must be a non-negative integer"))?;
                Some((limit as usize).min(MAX_QUERY_LIMIT))
            }
        };

        let conditions = selector
            .iter()
            .map(|(field, condition)| parse_condition(field, condition))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { conditions, limit })
    }

    /// Maximum number of results requested, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether the stored bytes are a JSON object satisfying every condition.
    #[must_use]
    pub fn matches(&self, stored: &[u8]) -> bool {
        match serde_json::from_slice::<JsonValue>(stored) {
            Ok(JsonValue::Object(document)) => self.matches_document(&document),
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(error = %e, "skipping non-JSON value during query");
                false
            }
        }
    }

    fn matches_document(&self, document: &Map<String, JsonValue>) -> bool {
        self.conditions.iter().all(|condition| {
            let field = lookup(document, &condition.path);
            condition.ops.iter().all(|op| op.holds(field))
        })
    }
}

fn parse_condition(field: &str, condition: &JsonValue) -> Result<FieldCondition, LedgerError> {
    if field.starts_with('$') {
        return Err(invalid(format!("unsupported combinator {field}")));
    }
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(invalid(format!("invalid field path {field:?}")));
    }
    let path = field.split('.').map(str::to_string).collect();

    let ops = match condition {
        JsonValue::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops
            .iter()
            .map(|(name, operand)| parse_op(name, operand))
            .collect::<Result<Vec<_>, _>>()?,
        JsonValue::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            return Err(invalid(format!(
                "field {field:?} mixes operators and literal members"
            )));
        }
        literal => vec![Op::Eq(literal.clone())],
    };

    Ok(FieldCondition { path, ops })
}

fn parse_op(name: &str, operand: &JsonValue) -> Result<Op, LedgerError> {
    let array = || {
        operand
            .as_array()
            .cloned()
            .ok_or_else(|| invalid(format!("{name} expects an array")))
    };
    Ok(match name {
        "$eq" => Op::Eq(operand.clone()),
        "$ne" => Op::Ne(operand.clone()),
        "$gt" => Op::Gt(operand.clone()),
        "$gte" => Op::Gte(operand.clone()),
        "$lt" => Op::Lt(operand.clone()),
        "$lte" => Op::Lte(operand.clone()),
        "$in" => Op::In(array()?),
        "$nin" => Op::Nin(array()?),
        "$exists" => Op::Exists(
            operand
                .as_bool()
                .ok_or_else(|| invalid("$exists expects a boolean"))?,
        ),
        other => return Err(invalid(format!("unsupported operator {other}"))),
    })
}

fn lookup<'a>(document: &'a Map<String, JsonValue>, path: &[String]) -> Option<&'a JsonValue> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(document.get(first)?, |value, segment| value.get(segment))
}

impl Op {
    fn holds(&self, field: Option<&JsonValue>) -> bool {
        let Some(value) = field else {
            return matches!(self, Self::Exists(false));
        };
        match self {
            Self::Eq(operand) => json_eq(value, operand),
            Self::Ne(operand) => !json_eq(value, operand),
            Self::Gt(operand) => compare(value, operand) == Some(Ordering::Greater),
            Self::Gte(operand) => matches!(
                compare(value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt(operand) => compare(value, operand) == Some(Ordering::Less),
            Self::Lte(operand) => matches!(
                compare(value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In(options) => options.iter().any(|o| json_eq(value, o)),
            Self::Nin(options) => !options.iter().any(|o| json_eq(value, o)),
            Self::Exists(expected) => *expected,
        }
    }
}

/// Equality that treats `1` and `1.0` as the same number.
fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(_), JsonValue::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Ordering between two numbers or two strings; `None` for anything else.
fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
