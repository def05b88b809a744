//! # Response Envelope
//!
//! The single result shape returned by every operation.

use crate::LedgerError;
use serde_json::{Value as JsonValue, json};

/// Message used when a failure is raised without one.
const GENERIC_FAILURE: &str = "operation failed";

/// Outcome of one dispatched operation.
///
/// There is no third variant: a handler either acknowledges (possibly with an
/// empty payload) or fails with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The operation completed. An empty payload means "acknowledged".
    Success(Vec<u8>),
    /// The operation failed. The message is never empty.
    Failure(String),
}

impl Response {
    /// A success carrying `payload`.
    #[must_use]
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self::Success(payload.into())
    }

    /// A success with no payload.
    #[must_use]
    pub fn acknowledged() -> Self {
        Self::Success(Vec::new())
    }

    /// A failure carrying `message`, or a generic message if it is blank.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Failure(GENERIC_FAILURE.to_string())
        } else {
            Self::Failure(message)
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload of a success, `None` for failures.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// The message of a failure, `None` for successes.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }

    /// Machine-readable form used by the CLI's JSON mode.
    ///
    /// Payloads that parse as JSON are embedded as JSON; anything else is
    /// embedded as a (lossily decoded) string.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Success(payload) if payload.is_empty() => {
                json!({ "status": "success", "payload": null })
            }
            Self::Success(payload) => {
                let payload = serde_json::from_slice::<JsonValue>(payload)
                    .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(payload).into()));
                json!({ "status": "success", "payload": payload })
            }
            Self::Failure(message) => json!({ "status": "failure", "message": message }),
        }
    }
}

impl From<Result<Vec<u8>, LedgerError>> for Response {
    fn from(result: Result<Vec<u8>, LedgerError>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
