//! # Command Dispatcher
//!
//! Routes a named request to its handler and always answers with a
//! [`Response`].
//!
//! ## Lifecycle of one request
//!
//! 1. Resolve the name with an exact lookup. No match fails with
//!    `UnknownOperation` and no handler runs.
//! 2. Invoke the handler with the argument list untouched; it checks its own
//!    arity.
//! 3. Convert the outcome: `Ok` becomes `Success`, `Err` becomes `Failure`
//!    with the error's message, a panic becomes
//!    `Failure("internal fault in <op>: <panic message>")`.
//!
//! Nothing raised by a handler escapes `invoke`.

use crate::contract::{
    GET_ENTITY, GET_ENTITY_BY_QUERY, GET_HISTORY_FOR_ENTITY, SAVE_ENTITY, get_entity,
    get_entity_by_query, get_history_for_entity, save_entity,
};
use crate::store::LedgerStore;
use crate::{LedgerError, Response};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// A registered operation: borrows the store, takes the raw argument list.
pub type Handler<S> = fn(&S, &[String]) -> Result<Vec<u8>, LedgerError>;

/// Name -> handler table over one store.
pub struct Dispatcher<S: LedgerStore> {
    store: S,
    handlers: BTreeMap<String, Handler<S>>,
}

impl<S: LedgerStore> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("operations", &self.operations())
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> Dispatcher<S> {
    /// A dispatcher with the four entity operations registered.
    pub fn new(store: S) -> Self {
        let mut dispatcher = Self {
            store,
            handlers: BTreeMap::new(),
        };
        dispatcher.register(SAVE_ENTITY, save_entity::<S>);
        dispatcher.register(GET_ENTITY, get_entity::<S>);
        dispatcher.register(GET_ENTITY_BY_QUERY, get_entity_by_query::<S>);
        dispatcher.register(GET_HISTORY_FOR_ENTITY, get_history_for_entity::<S>);
        dispatcher
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Handler<S>,
    ) -> Option<Handler<S>> {
        self.handlers.insert(name.into(), handler)
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dispatch one request.
    pub fn invoke(&self, operation: &str, args: &[String]) -> Response {
        let span = tracing::debug_span!("invoke", operation, args = args.len());
        let _enter = span.enter();

        let Some(handler) = self.handlers.get(operation) else {
            let e = LedgerError::UnknownOperation(operation.to_string());
            tracing::warn!(error = %e, "unknown operation requested");
            return Response::failure(e.to_string());
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(&self.store, args))) {
            Ok(Ok(payload)) => {
                tracing::debug!(bytes = payload.len(), "operation succeeded");
                Response::success(payload)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "operation failed");
                Response::failure(e.to_string())
            }
            Err(cause) => {
                let message = panic_message(cause.as_ref());
                tracing::error!(panic = %message, "operation panicked");
                Response::failure(format!("internal fault in {operation}: {message}"))
            }
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedger;

    fn dispatcher() -> Dispatcher<InMemoryLedger> {
        Dispatcher::new(InMemoryLedger::new())
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn boom(_: &InMemoryLedger, _: &[String]) -> Result<Vec<u8>, LedgerError> {
        panic!("disk on fire")
    }

    fn echo(_: &InMemoryLedger, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        Ok(args.join(" ").into_bytes())
    }

    #[test]
    fn builtin_operations_listed_sorted() {
        assert_eq!(
            dispatcher().operations(),
            [
                "GetEntity",
                "GetEntityByQuery",
                "GetHistoryForEntity",
                "SaveEntity"
            ]
        );
    }

    #[test]
    fn unknown_operation_fails_by_name() {
        let response = dispatcher().invoke("DropTables", &[]);
        assert_eq!(response.message(), Some("Invalid operation name: DropTables"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(!dispatcher().invoke("getentity", &args(&["u1"])).is_success());
    }

    #[test]
    fn panic_becomes_failure() {
        let mut d = dispatcher();
        d.register("Boom", boom);
        let response = d.invoke("Boom", &[]);
        assert_eq!(
            response.message(),
            Some("internal fault in Boom: disk on fire")
        );
        // the dispatcher stays usable afterwards
        assert!(d.invoke("GetEntity", &args(&["u1"])).is_success());
    }

    #[test]
    fn custom_operation_can_be_registered() {
        let mut d = dispatcher();
        assert!(d.register("Echo", echo).is_none());
        let response = d.invoke("Echo", &args(&["a", "b"]));
        assert_eq!(response.payload(), Some(&b"a b"[..]));
        assert!(d.register("Echo", echo).is_some());
    }

    #[test]
    fn handler_errors_become_failures() {
        let response = dispatcher().invoke("SaveEntity", &args(&["Ghost", "{}"]));
        assert_eq!(response.message(), Some("Unknown record kind: Ghost"));
    }
}
