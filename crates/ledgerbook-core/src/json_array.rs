//! # Cursor-to-Array Serializer
//!
//! Streams a cursor into a single JSON array, one element per item.
//!
//! Output is produced incrementally: `[`, then each element (preceded by `,`
//! unless it is the first), then `]`. Only the item being written is held in
//! memory. Stored record bytes are spliced in verbatim, never re-encoded: a
//! malformed stored payload yields malformed output.
//!
//! ## Wire shapes
//!
//! ```text
//! query:   {"Key":"<key>", "Record":<stored JSON>}
//! history: {"TxId":"<tx>", "Value":<stored JSON|null>, "Timestamp":"<utc>", "IsDelete":"true|false"}
//! ```
//!
//! The cursor is closed on every exit path. A read failure mid-stream aborts
//! with that error and the partially written output is never returned.

use crate::cursor::{Cursor, ScopedCursor};
use crate::{HistoryEntry, KvEntry, LedgerError};
use std::io::{self, Write};

// =============================================================================
// ARRAY WRITER
// =============================================================================

/// Incremental writer for the syntax of one JSON array.
#[derive(Debug)]
pub struct JsonArrayWriter<W: Write> {
    out: W,
    elements: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Write the opening bracket.
    pub fn begin(mut out: W) -> Result<Self, LedgerError> {
        out.write_all(b"[").map_err(output_error)?;
        Ok(Self { out, elements: 0 })
    }

    /// Write one element, separated from the previous one by a comma.
    pub fn element(
        &mut self,
        write: impl FnOnce(&mut W) -> io::Result<()>,
    ) -> Result<(), LedgerError> {
        if self.elements > 0 {
            self.out.write_all(b",").map_err(output_error)?;
        }
        write(&mut self.out).map_err(output_error)?;
        self.elements += 1;
        Ok(())
    }

    /// Number of elements written so far.
    pub fn len(&self) -> usize {
        self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Write the closing bracket and hand back the sink.
    pub fn finish(mut self) -> Result<W, LedgerError> {
        self.out.write_all(b"]").map_err(output_error)?;
        self.out.flush().map_err(output_error)?;
        Ok(self.out)
    }
}

fn output_error(e: io::Error) -> LedgerError {
    LedgerError::Serialization(format!("array output: {e}"))
}

/// Write `s` as a JSON string literal (quoted and escaped).
fn write_json_str<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    serde_json::to_writer(out, s).map_err(io::Error::from)
}

// =============================================================================
// ELEMENT SHAPES
// =============================================================================

/// `{"Key":"<key>", "Record":<value>}`
pub fn write_query_element<W: Write>(out: &mut W, entry: &KvEntry) -> io::Result<()> {
    out.write_all(br#"{"Key":"#)?;
    write_json_str(out, &entry.key)?;
    out.write_all(br#", "Record":"#)?;
    out.write_all(&entry.value)?;
    out.write_all(b"}")
}

/// `{"TxId":"<tx>", "Value":<value|null>, "Timestamp":"<utc>", "IsDelete":"<bool>"}`
///
/// Tombstones always render `null`, whatever bytes they still carry.
pub fn write_history_element<W: Write>(out: &mut W, entry: &HistoryEntry) -> io::Result<()> {
    out.write_all(br#"{"TxId":"#)?;
    write_json_str(out, &entry.tx_id)?;
    out.write_all(br#", "Value":"#)?;
    if entry.is_delete {
        out.write_all(b"null")?;
    } else {
        out.write_all(&entry.value)?;
    }
    out.write_all(br#", "Timestamp":"#)?;
    write_json_str(out, &entry.timestamp.to_string())?;
    out.write_all(br#", "IsDelete":"#)?;
    out.write_all(if entry.is_delete {
        br#""true""#
    } else {
        br#""false""#
    })?;
    out.write_all(b"}")
}

// =============================================================================
// CURSOR STREAMING
// =============================================================================

/// Drain `cursor` into `out` as a JSON array, closing the cursor on every path.
fn stream_array<C, W>(
    cursor: C,
    out: W,
    mut write_item: impl FnMut(&mut W, &C::Item) -> io::Result<()>,
) -> Result<W, LedgerError>
where
    C: Cursor,
    W: Write,
{
    let mut cursor = ScopedCursor::new(cursor);
    let mut array = JsonArrayWriter::begin(out)?;

    while let Some(item) = cursor.advance()? {
        array.element(|w| write_item(w, &item))?;
    }
    cursor.close()?;

    tracing::debug!(elements = array.len(), "cursor streamed to array");
    array.finish()
}

/// Stream a rich-query cursor as an array of `{"Key", "Record"}` objects.
pub fn write_query_array<C, W>(cursor: C, out: W) -> Result<W, LedgerError>
where
    C: Cursor<Item = KvEntry>,
    W: Write,
{
    stream_array(cursor, out, write_query_element)
}

/// Stream a history cursor as an array of `{"TxId", "Value", "Timestamp", "IsDelete"}` objects.
pub fn write_history_array<C, W>(cursor: C, out: W) -> Result<W, LedgerError>
where
    C: Cursor<Item = HistoryEntry>,
    W: Write,
{
    stream_array(cursor, out, write_history_element)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerTimestamp;
    use crate::cursor::tests::ScriptedCursor;
    use std::rc::Rc;

    fn kv(key: &str, value: &str) -> KvEntry {
        KvEntry::new(key, value.as_bytes())
    }

    fn query_json(entries: Vec<KvEntry>) -> String {
        let bytes = write_query_array(ScriptedCursor::new(entries), Vec::new()).expect("stream");
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn empty_query_is_empty_array() {
        assert_eq!(query_json(vec![]), "[]");
    }

    #[test]
    fn single_query_element_has_no_comma_artifacts() {
        let json = query_json(vec![kv("u1", r#"{"id":"u1"}"#)]);
        assert_eq!(json, r#"[{"Key":"u1", "Record":{"id":"u1"}}]"#);
    }

    #[test]
    fn three_query_elements_form_valid_array() {
        let json = query_json(vec![
            kv("a", r#"{"n":1}"#),
            kv("b", r#"{"n":2}"#),
            kv("c", r#"{"n":3}"#),
        ]);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        let items = parsed.as_array().expect("array");
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["Key"], "c");
        assert_eq!(items[1]["Record"]["n"], 2);
        assert!(!json.contains(",,"));
        assert!(!json.contains("[,"));
        assert!(!json.contains(",]"));
    }

    #[test]
    fn keys_are_escaped() {
        let json = query_json(vec![kv(r#"we"ird"#, "{}")]);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed[0]["Key"], r#"we"ird"#);
    }

    #[test]
    fn malformed_record_is_spliced_verbatim() {
        let json = query_json(vec![kv("k", "{oops")]);
        assert_eq!(json, r#"[{"Key":"k", "Record":{oops}]"#);
    }

    #[test]
    fn history_element_shape() {
        let entry = HistoryEntry {
            tx_id: "t1".into(),
            value: br#"{"id":"u1"}"#.to_vec(),
            is_delete: false,
            timestamp: LedgerTimestamp::new(0, 0),
        };
        let bytes =
            write_history_array(ScriptedCursor::new(vec![entry]), Vec::new()).expect("stream");
        assert_eq!(
            String::from_utf8(bytes).expect("utf8"),
            r#"[{"TxId":"t1", "Value":{"id":"u1"}, "Timestamp":"1970-01-01 00:00:00 +0000 UTC", "IsDelete":"false"}]"#
        );
    }

    #[test]
    fn tombstone_value_is_null_even_with_leftover_bytes() {
        let entry = HistoryEntry {
            tx_id: "t2".into(),
            value: br#"{"stale":true}"#.to_vec(),
            is_delete: true,
            timestamp: LedgerTimestamp::new(60, 0),
        };
        let bytes =
            write_history_array(ScriptedCursor::new(vec![entry]), Vec::new()).expect("stream");
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        assert!(parsed[0]["Value"].is_null());
        assert_eq!(parsed[0]["IsDelete"], "true");
    }

    #[test]
    fn cursor_closed_once_on_success() {
        let cursor = ScriptedCursor::new(vec![kv("a", "1"), kv("b", "2")]);
        let closes = Rc::clone(&cursor.closes);
        write_query_array(cursor, Vec::new()).expect("stream");
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn cursor_closed_once_on_mid_stream_failure() {
        let cursor =
            ScriptedCursor::new(vec![kv("a", "1"), kv("b", "2"), kv("c", "3")]).failing_at(2);
        let closes = Rc::clone(&cursor.closes);
        let result = write_query_array(cursor, Vec::new());
        assert!(matches!(result, Err(LedgerError::StoreRead(_))));
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn cursor_closed_on_failure_before_first_item() {
        let cursor = ScriptedCursor::<HistoryEntry>::new(vec![]).failing_at(0);
        let closes = Rc::clone(&cursor.closes);
        assert!(write_history_array(cursor, Vec::new()).is_err());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn writer_counts_elements() {
        let mut array = JsonArrayWriter::begin(Vec::new()).expect("begin");
        assert!(array.is_empty());
        array.element(|w| w.write_all(b"1")).expect("element");
        array.element(|w| w.write_all(b"2")).expect("element");
        assert_eq!(array.len(), 2);
        assert_eq!(array.finish().expect("finish"), b"[1,2]");
    }
}
