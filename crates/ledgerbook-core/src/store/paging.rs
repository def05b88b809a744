//! Page-at-a-time cursor shared by the backends.
//!
//! A backend supplies a [`PageSource`] that knows how to fetch the rows after
//! its own position. [`PagedCursor`] buffers one page, refills it on demand,
//! applies the optional result limit, and releases the source on close.

use crate::LedgerError;
use crate::cursor::Cursor;
use std::collections::VecDeque;

/// One page of rows and whether the source has nothing after it.
pub(crate) struct Page<T> {
    pub rows: Vec<T>,
    pub exhausted: bool,
}

/// Backend side of a paged cursor.
pub(crate) trait PageSource {
    type Item;

    /// Fetch the rows following the last page. A page may be empty without
    /// the source being exhausted (every scanned row was filtered out).
    fn fetch_page(&mut self) -> Result<Page<Self::Item>, LedgerError>;

    /// Drop snapshots or transactions held by the source.
    fn release(&mut self);
}

pub(crate) struct PagedCursor<S: PageSource> {
    source: S,
    buffered: VecDeque<S::Item>,
    exhausted: bool,
    remaining: Option<usize>,
    closed: bool,
}

impl<S: PageSource> PagedCursor<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            buffered: VecDeque::new(),
            exhausted: false,
            remaining: None,
            closed: false,
        }
    }

    /// Stop after `limit` items.
    pub(crate) fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.remaining = limit;
        self
    }
}

impl<S: PageSource> Cursor for PagedCursor<S> {
    type Item = S::Item;

    fn advance(&mut self) -> Result<Option<S::Item>, LedgerError> {
        if self.closed {
            return Err(LedgerError::StoreRead("cursor already closed".into()));
        }
        if self.remaining == Some(0) {
            return Ok(None);
        }
        loop {
            if let Some(item) = self.buffered.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page = self.source.fetch_page()?;
            self.exhausted = page.exhausted;
            self.buffered.extend(page.rows);
        }
    }

    fn close(&mut self) -> Result<(), LedgerError> {
        if !self.closed {
            self.closed = true;
            self.buffered.clear();
            self.source.release();
        }
        Ok(())
    }
}
