//! # Cursors
//!
//! Forward-only handles over backend results, and the scope guard that
//! releases them.
//!
//! A cursor holds backend resources (a read transaction, a snapshot) until it
//! is closed. Code that opens a cursor wraps it in [`ScopedCursor`], which
//! closes it exactly once: explicitly through [`ScopedCursor::close`] on the
//! success path, or from `Drop` on any early return.

use crate::LedgerError;

/// A forward-only, lazily-advancing sequence of backend results.
pub trait Cursor {
    type Item;

    /// Yield the next item, or `Ok(None)` once the cursor is exhausted.
    ///
    /// After an error the cursor must not be advanced again.
    fn advance(&mut self) -> Result<Option<Self::Item>, LedgerError>;

    /// Release every backend resource held by the cursor.
    ///
    /// Called exactly once by [`ScopedCursor`].
    fn close(&mut self) -> Result<(), LedgerError>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn advance(&mut self) -> Result<Option<Self::Item>, LedgerError> {
        (**self).advance()
    }

    fn close(&mut self) -> Result<(), LedgerError> {
        (**self).close()
    }
}

/// Scoped ownership of an open cursor.
///
/// Guarantees the wrapped cursor is closed exactly once, whichever way the
/// owning scope is left.
#[derive(Debug)]
pub struct ScopedCursor<C: Cursor> {
    cursor: C,
    closed: bool,
}

impl<C: Cursor> ScopedCursor<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            closed: false,
        }
    }

    /// Advance the underlying cursor.
    pub fn advance(&mut self) -> Result<Option<C::Item>, LedgerError> {
        self.cursor.advance()
    }

    /// Close the cursor now and report the outcome.
    pub fn close(mut self) -> Result<(), LedgerError> {
        self.closed = true;
        self.cursor.close()
    }
}

impl<C: Cursor> Drop for ScopedCursor<C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.cursor.close() {
            tracing::warn!(error = %e, "failed to close cursor on early exit");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
